//! `window.*` plumbing shared by the injected-wallet adapters.

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

use stakepack_core::WalletError;

pub(crate) fn window_prop(key: &str) -> Result<JsValue, WalletError> {
    let window =
        web_sys::window().ok_or_else(|| WalletError::Transport("missing window".to_owned()))?;
    let value = get_prop(&window.into(), key)?;
    if value.is_null() || value.is_undefined() {
        return Err(WalletError::ProviderNotFound(format!("window.{key} missing")));
    }
    Ok(value)
}

pub(crate) fn get_prop(target: &JsValue, key: &str) -> Result<JsValue, WalletError> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .map_err(|e| WalletError::Transport(format!("read property {key} failed: {e:?}")))
}

pub(crate) fn get_path(target: &JsValue, path: &[&str]) -> Result<JsValue, WalletError> {
    let mut current = target.clone();
    for key in path {
        if current.is_null() || current.is_undefined() {
            return Ok(JsValue::UNDEFINED);
        }
        current = get_prop(&current, key)?;
    }
    Ok(current)
}

pub(crate) fn function(target: &JsValue, key: &str) -> Option<js_sys::Function> {
    get_prop(target, key)
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
}

/// Invokes `target[key](...args)` with `this` bound to `target`.
pub(crate) fn invoke(target: &JsValue, key: &str, args: &[JsValue]) -> Result<JsValue, WalletError> {
    let f = function(target, key)
        .ok_or_else(|| WalletError::Transport(format!("{key} is not a function")))?;
    let js_args: js_sys::Array = args.iter().collect();
    f.apply(target, &js_args)
        .map_err(|e| WalletError::Transport(format!("{key} threw: {}", js_error_message(&e))))
}

/// Awaits `value` when it is a promise, passes it through otherwise.
pub(crate) async fn settle(value: JsValue) -> Result<JsValue, WalletError> {
    settle_raw(value)
        .await
        .map_err(|e| WalletError::Transport(js_error_message(&e)))
}

/// Like [`settle`] but hands back the rejection value untouched.
pub(crate) async fn settle_raw(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<js_sys::Promise>() {
        Ok(promise) => wasm_bindgen_futures::JsFuture::from(promise).await,
        Err(plain) => Ok(plain),
    }
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, WalletError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| WalletError::Transport(format!("failed to encode js value: {e}")))
}

/// Converts a JS result to JSON. BigNumber-like objects expose `_hex`, which
/// survives the conversion; anything else unrepresentable falls back to its
/// `toString()`.
pub(crate) fn from_js(value: JsValue) -> Result<Value, WalletError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    if let Some(big) = value.dyn_ref::<js_sys::BigInt>() {
        let text: String = big
            .to_string(10)
            .map_err(|e| WalletError::Transport(format!("bigint to string failed: {e:?}")))?
            .into();
        return Ok(Value::String(text));
    }
    serde_wasm_bindgen::from_value(value.clone()).or_else(|_| {
        value
            .as_string()
            .or_else(|| js_sys::JSON::stringify(&value).ok().and_then(|s| s.as_string()))
            .map(Value::String)
            .ok_or_else(|| WalletError::Transport("failed to decode js value".to_owned()))
    })
}

pub(crate) fn js_error_message(e: &JsValue) -> String {
    get_prop(e, "message")
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| e.as_string())
        .unwrap_or_else(|| format!("{e:?}"))
}
