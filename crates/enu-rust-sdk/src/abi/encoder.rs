//! ABI-driven action data codec.
//!
//! Structured JSON payloads are serialized field by field in the order the
//! ABI struct declares, and decoded back into objects with the same field
//! order.

use super::types::{Abi, AbiStruct};
use crate::crypto::PublicKey;
use crate::error::{EnuError, EnuResult};
use crate::types::{Asset, Name, Symbol, TimePointSec};
use crate::wire::{ByteReader, ByteWriter};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Encodes a structured action payload against the contract ABI.
pub fn encode_action_data(abi: &Abi, action: &str, data: &Value) -> EnuResult<Vec<u8>> {
    let def = abi
        .action_struct(action)
        .ok_or_else(|| EnuError::serialize(format!("abi has no action `{action}`")))?;
    let mut writer = ByteWriter::new();
    encode_struct(abi, def, data, &mut writer)?;
    Ok(writer.into_bytes())
}

/// Decodes packed action data back into a JSON object in ABI field order.
pub fn decode_action_data(abi: &Abi, action: &str, bytes: &[u8]) -> EnuResult<Value> {
    let def = abi
        .action_struct(action)
        .ok_or_else(|| EnuError::serialize(format!("abi has no action `{action}`")))?;
    let mut reader = ByteReader::new(bytes);
    let value = decode_struct(abi, def, &mut reader)?;
    if reader.remaining() > 0 {
        return Err(EnuError::serialize(format!(
            "{} trailing bytes after `{action}` payload",
            reader.remaining()
        )));
    }
    Ok(value)
}

fn encode_struct(
    abi: &Abi,
    def: &AbiStruct,
    value: &Value,
    writer: &mut ByteWriter,
) -> EnuResult<()> {
    let object = value.as_object().ok_or_else(|| {
        EnuError::serialize(format!("`{}` payload must be an object", def.name))
    })?;
    if !def.base.is_empty() {
        let base = abi
            .struct_def(abi.resolve_type(&def.base))
            .ok_or_else(|| EnuError::serialize(format!("unknown base struct `{}`", def.base)))?;
        encode_struct(abi, base, value, writer)?;
    }
    for field in &def.fields {
        match object.get(&field.name) {
            Some(v) => encode_type(abi, &field.type_name, v, writer)?,
            // absent optionals encode as not-present
            None if abi.resolve_type(&field.type_name).ends_with('?') => writer.write_u8(0),
            None => return Err(EnuError::missing_field(&def.name, &field.name)),
        }
    }
    Ok(())
}

fn decode_struct(abi: &Abi, def: &AbiStruct, reader: &mut ByteReader<'_>) -> EnuResult<Value> {
    let mut object = Map::new();
    if !def.base.is_empty() {
        let base = abi
            .struct_def(abi.resolve_type(&def.base))
            .ok_or_else(|| EnuError::serialize(format!("unknown base struct `{}`", def.base)))?;
        if let Value::Object(fields) = decode_struct(abi, base, reader)? {
            object.extend(fields);
        }
    }
    for field in &def.fields {
        let value = decode_type(abi, &field.type_name, reader)?;
        object.insert(field.name.clone(), value);
    }
    Ok(Value::Object(object))
}

fn encode_type(
    abi: &Abi,
    type_name: &str,
    value: &Value,
    writer: &mut ByteWriter,
) -> EnuResult<()> {
    let resolved = abi.resolve_type(type_name);
    if let Some(inner) = resolved.strip_suffix("[]") {
        let items = value
            .as_array()
            .ok_or_else(|| EnuError::serialize(format!("expected array for `{resolved}`")))?;
        writer.write_varuint32(items.len() as u32);
        for item in items {
            encode_type(abi, inner, item, writer)?;
        }
        return Ok(());
    }
    if let Some(inner) = resolved.strip_suffix('?') {
        if value.is_null() {
            writer.write_u8(0);
        } else {
            writer.write_u8(1);
            encode_type(abi, inner, value, writer)?;
        }
        return Ok(());
    }

    match resolved {
        "bool" => writer.write_u8(if expect_bool(resolved, value)? { 1 } else { 0 }),
        "uint8" => writer.write_u8(narrow(resolved, expect_u64(resolved, value)?)?),
        "uint16" => writer.write_u16(narrow(resolved, expect_u64(resolved, value)?)?),
        "uint32" => writer.write_u32(narrow(resolved, expect_u64(resolved, value)?)?),
        "uint64" => writer.write_u64(expect_u64(resolved, value)?),
        "int8" => writer.write_i8(narrow_i(resolved, expect_i64(resolved, value)?)?),
        "int16" => writer.write_i16(narrow_i(resolved, expect_i64(resolved, value)?)?),
        "int32" => writer.write_i32(narrow_i(resolved, expect_i64(resolved, value)?)?),
        "int64" => writer.write_i64(expect_i64(resolved, value)?),
        "varuint32" => writer.write_varuint32(narrow(resolved, expect_u64(resolved, value)?)?),
        "float64" => {
            let f = value
                .as_f64()
                .ok_or_else(|| EnuError::serialize("expected number for `float64`"))?;
            writer.write_raw(&f.to_le_bytes());
        }
        "name" | "account_name" | "action_name" | "permission_name" | "scope_name"
        | "table_name" => {
            let name = Name::from_str(expect_str(resolved, value)?)?;
            writer.write_name(&name);
        }
        "string" => writer.write_string(expect_str(resolved, value)?),
        "bytes" => {
            let bytes = hex::decode(expect_str(resolved, value)?)?;
            writer.write_bytes(&bytes);
        }
        "checksum256" => {
            let bytes = hex::decode(expect_str(resolved, value)?)?;
            let digest: [u8; 32] = bytes
                .try_into()
                .map_err(|_| EnuError::serialize("checksum256 must be 32 bytes"))?;
            writer.write_checksum256(&digest);
        }
        "asset" => writer.write_asset(&asset_from_value(value)?),
        "symbol" => {
            let symbol = Symbol::from_str(expect_str(resolved, value)?)?;
            writer.write_symbol(&symbol);
        }
        "time_point_sec" => {
            let t = match value.as_u64() {
                Some(secs) => TimePointSec::from_secs(narrow(resolved, secs)?),
                None => TimePointSec::from_str(expect_str(resolved, value)?)?,
            };
            writer.write_time_point_sec(t);
        }
        "public_key" => {
            let key = PublicKey::from_str(expect_str(resolved, value)?)?;
            // K1 discriminant then the compressed point
            writer.write_u8(0);
            writer.write_raw(&key.to_compressed());
        }
        other => {
            let def = abi
                .struct_def(other)
                .ok_or_else(|| EnuError::serialize(format!("unknown abi type `{other}`")))?;
            encode_struct(abi, def, value, writer)?;
        }
    }
    Ok(())
}

fn decode_type(abi: &Abi, type_name: &str, reader: &mut ByteReader<'_>) -> EnuResult<Value> {
    let resolved = abi.resolve_type(type_name);
    if let Some(inner) = resolved.strip_suffix("[]") {
        let len = reader.read_varuint32()? as usize;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(decode_type(abi, inner, reader)?);
        }
        return Ok(Value::Array(items));
    }
    if let Some(inner) = resolved.strip_suffix('?') {
        return match reader.read_u8()? {
            0 => Ok(Value::Null),
            1 => decode_type(abi, inner, reader),
            n => Err(EnuError::serialize(format!("bad optional marker {n}"))),
        };
    }

    Ok(match resolved {
        "bool" => Value::Bool(reader.read_u8()? != 0),
        "uint8" => Value::from(reader.read_u8()?),
        "uint16" => Value::from(reader.read_u16()?),
        "uint32" => Value::from(reader.read_u32()?),
        "uint64" => Value::from(reader.read_u64()?),
        "int8" => Value::from(reader.read_i8()?),
        "int16" => Value::from(reader.read_i16()?),
        "int32" => Value::from(reader.read_i32()?),
        "int64" => Value::from(reader.read_i64()?),
        "varuint32" => Value::from(reader.read_varuint32()?),
        "float64" => {
            let bytes = reader.read_raw(8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::from(f64::from_le_bytes(buf))
        }
        "name" | "account_name" | "action_name" | "permission_name" | "scope_name"
        | "table_name" => Value::String(reader.read_name()?.to_string()),
        "string" => Value::String(reader.read_string()?),
        "bytes" => Value::String(hex::encode(reader.read_bytes()?)),
        "checksum256" => Value::String(hex::encode(reader.read_checksum256()?)),
        "asset" => Value::String(reader.read_asset()?.to_string()),
        "symbol" => Value::String(reader.read_symbol()?.to_string()),
        "time_point_sec" => Value::String(reader.read_time_point_sec()?.to_string()),
        "public_key" => {
            match reader.read_u8()? {
                0 => {}
                n => return Err(EnuError::serialize(format!("unsupported key type {n}"))),
            }
            let bytes = reader.read_raw(33)?;
            let mut buf = [0u8; 33];
            buf.copy_from_slice(bytes);
            Value::String(PublicKey::from_compressed(&buf)?.to_string())
        }
        other => {
            let def = abi
                .struct_def(other)
                .ok_or_else(|| EnuError::serialize(format!("unknown abi type `{other}`")))?;
            decode_struct(abi, def, reader)?
        }
    })
}

/// Accepts `"1.0000 ENU"` or `{"amount": .., "symbol": "precision,CODE"}`.
///
/// The object form pins the expected symbol: a string amount that parses to a
/// different precision is a [`EnuError::PrecisionMismatch`].
fn asset_from_value(value: &Value) -> EnuResult<Asset> {
    if let Some(s) = value.as_str() {
        return Asset::from_str(s);
    }
    if let Some(object) = value.as_object() {
        let symbol: Symbol = object
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| EnuError::serialize("asset object needs a `symbol` string"))?
            .parse()?;
        let amount = object
            .get("amount")
            .ok_or_else(|| EnuError::serialize("asset object needs an `amount`"))?;
        if let Some(s) = amount.as_str() {
            return Asset::from_str_with_symbol(s, &symbol);
        }
        if let Some(n) = amount.as_i64() {
            return Ok(Asset::new(n, symbol));
        }
        return Err(EnuError::serialize("asset `amount` must be a string or integer"));
    }
    Err(EnuError::serialize("expected asset string or object"))
}

fn expect_str<'a>(type_name: &str, value: &'a Value) -> EnuResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| EnuError::serialize(format!("expected string for `{type_name}`")))
}

fn expect_bool(type_name: &str, value: &Value) -> EnuResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| EnuError::serialize(format!("expected bool for `{type_name}`")))
}

fn expect_u64(type_name: &str, value: &Value) -> EnuResult<u64> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.parse() {
            return Ok(n);
        }
    }
    Err(EnuError::serialize(format!(
        "expected unsigned integer for `{type_name}`"
    )))
}

fn expect_i64(type_name: &str, value: &Value) -> EnuResult<i64> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.parse() {
            return Ok(n);
        }
    }
    Err(EnuError::serialize(format!(
        "expected integer for `{type_name}`"
    )))
}

fn narrow<T: TryFrom<u64>>(type_name: &str, value: u64) -> EnuResult<T> {
    T::try_from(value)
        .map_err(|_| EnuError::serialize(format!("{value} does not fit `{type_name}`")))
}

fn narrow_i<T: TryFrom<i64>>(type_name: &str, value: i64) -> EnuResult<T> {
    T::try_from(value)
        .map_err(|_| EnuError::serialize(format!("{value} does not fit `{type_name}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_abi() -> Abi {
        Abi::from_value(
            "enu.token",
            &json!({
                "version": "enumivo::abi/1.0",
                "types": [
                    {"new_type_name": "account_name", "type": "name"}
                ],
                "structs": [
                    {
                        "name": "transfer",
                        "fields": [
                            {"name": "from", "type": "account_name"},
                            {"name": "to", "type": "account_name"},
                            {"name": "quantity", "type": "asset"},
                            {"name": "memo", "type": "string"}
                        ]
                    },
                    {
                        "name": "create",
                        "fields": [
                            {"name": "issuer", "type": "account_name"},
                            {"name": "maximum_supply", "type": "asset"}
                        ]
                    },
                    {
                        "name": "updateauth",
                        "fields": [
                            {"name": "account", "type": "account_name"},
                            {"name": "keys", "type": "public_key[]"},
                            {"name": "note", "type": "string?"}
                        ]
                    }
                ],
                "actions": [
                    {"name": "transfer", "type": "transfer"},
                    {"name": "create", "type": "create"},
                    {"name": "updateauth", "type": "updateauth"}
                ]
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_transfer_round_trip_in_field_order() {
        let abi = token_abi();
        let data = json!({
            "from": "inita",
            "to": "initb",
            "quantity": "1.0000 ENU",
            "memo": ""
        });
        let bytes = encode_action_data(&abi, "transfer", &data).unwrap();
        // two names, an asset, and one empty-string length byte
        assert_eq!(bytes.len(), 33);

        let decoded = decode_action_data(&abi, "transfer", &bytes).unwrap();
        let keys: Vec<&str> = decoded
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["from", "to", "quantity", "memo"]);
        assert_eq!(decoded["from"], "inita");
        assert_eq!(decoded["quantity"], "1.0000 ENU");
    }

    #[test]
    fn test_missing_field() {
        let abi = token_abi();
        let data = json!({"from": "inita", "to": "initb", "memo": ""});
        let err = encode_action_data(&abi, "transfer", &data).unwrap_err();
        match err {
            EnuError::MissingField { type_name, field } => {
                assert_eq!(type_name, "transfer");
                assert_eq!(field, "quantity");
            }
            other => panic!("expected MissingField, got {other}"),
        }
    }

    #[test]
    fn test_unknown_action() {
        let abi = token_abi();
        let err = encode_action_data(&abi, "close", &json!({})).unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn test_asset_object_precision_mismatch() {
        let abi = token_abi();
        let data = json!({
            "issuer": "currency",
            "maximum_supply": {"amount": "10000.00 SYM", "symbol": "0,SYM"}
        });
        let err = encode_action_data(&abi, "create", &data).unwrap_err();
        assert!(matches!(err, EnuError::PrecisionMismatch { .. }));

        let ok = json!({
            "issuer": "currency",
            "maximum_supply": {"amount": "10000 SYM", "symbol": "0,SYM"}
        });
        encode_action_data(&abi, "create", &ok).unwrap();
    }

    #[test]
    fn test_string_assets_infer_precision() {
        let abi = token_abi();
        let whole = json!({"issuer": "currency", "maximum_supply": "10000 SYM"});
        let scaled = json!({"issuer": "currency", "maximum_supply": "10000.00 SYM"});
        let a = encode_action_data(&abi, "create", &whole).unwrap();
        let b = encode_action_data(&abi, "create", &scaled).unwrap();
        assert_ne!(a, b, "precision is part of the wire form");
    }

    #[test]
    fn test_array_and_optional() {
        let abi = token_abi();
        let key = crate::crypto::PrivateKey::seed_private("key1")
            .unwrap()
            .public_key()
            .to_string();

        let with_note = json!({"account": "inita", "keys": [key], "note": "hi"});
        let bytes = encode_action_data(&abi, "updateauth", &with_note).unwrap();
        let decoded = decode_action_data(&abi, "updateauth", &bytes).unwrap();
        assert_eq!(decoded["keys"][0], key);
        assert_eq!(decoded["note"], "hi");

        // absent optional encodes as not-present and decodes as null
        let without_note = json!({"account": "inita", "keys": []});
        let bytes = encode_action_data(&abi, "updateauth", &without_note).unwrap();
        let decoded = decode_action_data(&abi, "updateauth", &bytes).unwrap();
        assert!(decoded["note"].is_null());
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let abi = token_abi();
        let data = json!({
            "from": "inita",
            "to": "initb",
            "quantity": "1.0000 ENU",
            "memo": ""
        });
        let mut bytes = encode_action_data(&abi, "transfer", &data).unwrap();
        bytes.push(0);
        assert!(decode_action_data(&abi, "transfer", &bytes).is_err());
    }

    #[test]
    fn test_integer_strings_are_accepted() {
        let abi = Abi::from_value(
            "currency",
            &json!({
                "structs": [
                    {"name": "burn", "fields": [{"name": "amount", "type": "uint64"}]}
                ],
                "actions": [{"name": "burn", "type": "burn"}]
            }),
        )
        .unwrap();
        let a = encode_action_data(&abi, "burn", &json!({"amount": 42})).unwrap();
        let b = encode_action_data(&abi, "burn", &json!({"amount": "42"})).unwrap();
        assert_eq!(a, b);
    }
}
