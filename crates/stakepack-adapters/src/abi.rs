use std::str::FromStr;

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, U256};
use serde_json::{Map, Value};

use stakepack_core::WalletError;

/// Calldata for `method(args...)`. Args follow the JSON conventions the core
/// uses: uints as numbers or decimal/hex strings, addresses as hex strings.
pub fn encode_call(abi: &JsonAbi, method: &str, args: &[Value]) -> Result<Bytes, WalletError> {
    let function = select_function(abi, method)?;
    if function.inputs.len() != args.len() {
        return Err(WalletError::Validation(format!(
            "{}: argument count mismatch: expected {}, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    let mut dyn_args = Vec::with_capacity(args.len());
    for (input, arg) in function.inputs.iter().zip(args.iter()) {
        let ty: DynSolType = input.ty.parse().map_err(|e| {
            WalletError::Validation(format!("unsupported type '{}': {e}", input.ty))
        })?;
        let value = parse_dyn_value(arg, &ty).map_err(|e| {
            WalletError::Validation(format!("arg '{}' parse failed: {e}", input.name))
        })?;
        dyn_args.push(value);
    }

    function
        .abi_encode_input(&dyn_args)
        .map(Bytes::from)
        .map_err(|e| WalletError::Validation(format!("abi encoding failed: {e}")))
}

/// Decodes return data into the shape an injected library would hand back:
/// a bare value for single outputs, an object when every output is named,
/// otherwise a positional array.
pub fn decode_output(abi: &JsonAbi, method: &str, data: &[u8]) -> Result<Value, WalletError> {
    let function = select_function(abi, method)?;
    let values = function
        .abi_decode_output(data, true)
        .map_err(|e| WalletError::ContractCallFailed(format!("{method}: undecodable output: {e}")))?;

    if values.len() == 1 {
        return dyn_to_json(&values[0]);
    }
    let all_named = function.outputs.iter().all(|o| !o.name.is_empty());
    if all_named {
        let mut map = Map::with_capacity(values.len());
        for (param, value) in function.outputs.iter().zip(values.iter()) {
            map.insert(param.name.clone(), dyn_to_json(value)?);
        }
        return Ok(Value::Object(map));
    }
    values
        .iter()
        .map(dyn_to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// `0x`-prefixed quantity as JSON-RPC expects for `value`.
pub fn quantity_hex(amount: U256) -> String {
    format!("0x{amount:x}")
}

pub fn parse_hex_data(raw: &Value) -> Result<Bytes, WalletError> {
    let text = raw
        .as_str()
        .ok_or_else(|| WalletError::ContractCallFailed(format!("expected hex data, got {raw}")))?;
    Bytes::from_str(text)
        .map_err(|e| WalletError::ContractCallFailed(format!("invalid hex data: {e}")))
}

fn select_function<'a>(abi: &'a JsonAbi, method: &str) -> Result<&'a Function, WalletError> {
    let (method_name, full_sig) = match method.split_once('(') {
        Some((name, _)) => (name, Some(method)),
        None => (method, None),
    };

    let candidates = abi
        .function(method_name)
        .ok_or_else(|| WalletError::Validation(format!("method not found: {method_name}")))?;

    if let Some(full_sig) = full_sig {
        return candidates
            .iter()
            .find(|f| f.signature() == full_sig)
            .ok_or_else(|| WalletError::Validation(format!("method signature not found: {full_sig}")));
    }

    candidates
        .first()
        .ok_or_else(|| WalletError::Validation(format!("method has no overloads: {method_name}")))
}

/// Only the types the stake ABI carries: `address`, `uint<N>` and `bool`.
fn parse_dyn_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Ok(DynSolValue::Bool(s == "true")),
            _ => Err("expected bool".to_owned()),
        },
        DynSolType::Uint(bits) => {
            let raw = match value {
                Value::String(s) => s.trim().to_owned(),
                Value::Number(n) => n.to_string(),
                _ => return Err("expected uint string/number".to_owned()),
            };
            U256::from_str(&raw)
                .map(|x| DynSolValue::Uint(x, *bits))
                .map_err(|e| format!("invalid uint: {e}"))
        }
        DynSolType::Address => value
            .as_str()
            .ok_or_else(|| "expected address string".to_owned())
            .and_then(|s| {
                Address::from_str(s.trim())
                    .map(DynSolValue::Address)
                    .map_err(|e| format!("invalid address: {e}"))
            }),
        other => Err(format!("type {other} not supported")),
    }
}

fn dyn_to_json(value: &DynSolValue) -> Result<Value, WalletError> {
    match value {
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::Uint(n, _) => Ok(Value::String(n.to_string())),
        DynSolValue::Address(a) => Ok(Value::String(a.to_checksum(None))),
        DynSolValue::Tuple(items) => items
            .iter()
            .map(dyn_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(WalletError::ContractCallFailed(format!(
            "output type {} not supported",
            other
                .sol_type_name()
                .map(|name| name.into_owned())
                .unwrap_or_else(|| "unknown".to_owned())
        ))),
    }
}
