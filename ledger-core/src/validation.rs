//! Shape checks for transport records
//!
//! These run on raw JSON before it is turned into a [`Transaction`] or a
//! [`Block`], so that a bad record is reported with the exact field that is
//! missing or malformed (`txs[3].amount`, `header.prev_hash`, ...).
//!
//! [`Transaction`]: crate::Transaction
//! [`Block`]: crate::Block

use crate::{Amount, CoreError, CoreResult, Hash};
use serde_json::{Map, Value};

fn field_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn object<'a>(value: &'a Value, field: &str) -> CoreResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CoreError::validation(field, "expected an object"))
}

fn required<'a>(obj: &'a Map<String, Value>, prefix: &str, name: &str) -> CoreResult<&'a Value> {
    obj.get(name)
        .ok_or_else(|| CoreError::validation(field_name(prefix, name), "missing"))
}

fn require_u64(obj: &Map<String, Value>, prefix: &str, name: &str) -> CoreResult<u64> {
    required(obj, prefix, name)?.as_u64().ok_or_else(|| {
        CoreError::validation(field_name(prefix, name), "expected an unsigned integer")
    })
}

fn require_u32(obj: &Map<String, Value>, prefix: &str, name: &str) -> CoreResult<u32> {
    let value = require_u64(obj, prefix, name)?;
    u32::try_from(value)
        .map_err(|_| CoreError::validation(field_name(prefix, name), "does not fit in 32 bits"))
}

fn require_str<'a>(obj: &'a Map<String, Value>, prefix: &str, name: &str) -> CoreResult<&'a str> {
    required(obj, prefix, name)?
        .as_str()
        .ok_or_else(|| CoreError::validation(field_name(prefix, name), "expected a string"))
}

fn optional_str(obj: &Map<String, Value>, prefix: &str, name: &str) -> CoreResult<()> {
    match obj.get(name) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(CoreError::validation(
            field_name(prefix, name),
            "expected a string",
        )),
    }
}

fn require_decimal<T, F>(obj: &Map<String, Value>, prefix: &str, name: &str, parse: F) -> CoreResult<T>
where
    F: FnOnce(&str) -> Option<T>,
{
    let text = require_str(obj, prefix, name)?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::validation(
            field_name(prefix, name),
            "expected a decimal string",
        ));
    }
    parse(text).ok_or_else(|| CoreError::validation(field_name(prefix, name), "out of range"))
}

fn require_hash(obj: &Map<String, Value>, prefix: &str, name: &str) -> CoreResult<Hash> {
    let text = require_str(obj, prefix, name)?;
    Hash::from_hex(text).map_err(|e| CoreError::validation(field_name(prefix, name), e.to_string()))
}

fn check_transaction(value: &Value, prefix: &str) -> CoreResult<()> {
    let obj = object(value, if prefix.is_empty() { "transaction" } else { prefix })?;

    require_u64(obj, prefix, "sequence")?;
    require_str(obj, prefix, "purchase_id")?;
    require_u64(obj, prefix, "timestamp")?;
    require_decimal(obj, prefix, "amount", |s| Amount::from_dec_str(s).ok())?;
    require_str(obj, prefix, "franchisee_id")?;
    require_str(obj, prefix, "user_email")?;
    require_u32(obj, prefix, "method")?;
    optional_str(obj, prefix, "signer")?;
    optional_str(obj, prefix, "signature")?;

    Ok(())
}

/// Check that `value` has the shape of a transaction record
pub fn validate_transaction(value: &Value) -> CoreResult<()> {
    check_transaction(value, "")
}

/// Check that `value` has the shape of a block record
pub fn validate_block(value: &Value) -> CoreResult<()> {
    let obj = object(value, "block")?;

    let header = object(required(obj, "", "header")?, "header")?;
    require_hash(header, "header", "prev_hash")?;
    require_decimal(header, "header", "height", |s| s.parse::<u64>().ok())?;
    require_hash(header, "header", "merkle_root")?;
    require_u64(header, "header", "timestamp")?;
    require_u32(header, "header", "tx_count")?;

    let txs = required(obj, "", "txs")?
        .as_array()
        .ok_or_else(|| CoreError::validation("txs", "expected an array"))?;
    for (i, tx) in txs.iter().enumerate() {
        check_transaction(tx, &format!("txs[{}]", i))?;
    }

    let tree = required(obj, "", "merkle_tree")?
        .as_array()
        .ok_or_else(|| CoreError::validation("merkle_tree", "expected an array"))?;
    for (i, node) in tree.iter().enumerate() {
        let field = format!("merkle_tree[{}]", i);
        let text = node
            .as_str()
            .ok_or_else(|| CoreError::validation(field.as_str(), "expected a string"))?;
        Hash::from_hex(text).map_err(|e| CoreError::validation(field.as_str(), e.to_string()))?;
    }

    Ok(())
}
