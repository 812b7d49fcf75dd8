//! # EIP-712 Typed Structured Data
//!
//! Hashing of typed data as signed by the identity key during `auth_verify`.
//!
//! ```text
//! digest = keccak256(0x19 0x01 || domainSeparator || hashStruct(primaryType, message))
//! ```
//!
//! Supported member types: `string`, `bytes`, `bytes1..32`, `address`, `bool`,
//! `uint8..256`, `int8..256`, declared struct types and dynamic or fixed
//! arrays of any of these.

use super::errors::TypedDataError;
use super::hashing::{keccak256, Hash};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared_types::{Address, U256};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the implicit domain struct type.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// The domain separator fields. Absent fields are left out of the domain type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
}

impl Eip712Domain {
    /// Domain with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn type_fields(&self) -> Vec<TypedField> {
        let mut fields = Vec::with_capacity(4);
        if self.name.is_some() {
            fields.push(TypedField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedField::new("verifyingContract", "address"));
        }
        fields
    }

    fn as_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), json!(name));
        }
        if let Some(version) = &self.version {
            map.insert("version".into(), json!(version));
        }
        if let Some(chain_id) = self.chain_id {
            map.insert("chainId".into(), json!(chain_id));
        }
        if let Some(contract) = &self.verifying_contract {
            map.insert("verifyingContract".into(), json!(contract.to_hex()));
        }
        Value::Object(map)
    }
}

/// A complete typed-data signing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub domain: Eip712Domain,
    /// Struct types by name. The domain type is derived and need not be listed.
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    pub message: Value,
}

impl TypedData {
    /// `encodeType` of the primary type.
    pub fn encode_type(&self) -> Result<String, TypedDataError> {
        encode_type(&self.primary_type, &self.types)
    }

    /// `hashStruct(EIP712Domain, domain)`.
    pub fn domain_separator(&self) -> Result<Hash, TypedDataError> {
        let mut types = BTreeMap::new();
        types.insert(DOMAIN_TYPE.to_string(), self.domain.type_fields());
        hash_struct(DOMAIN_TYPE, &self.domain.as_value(), &types)
    }

    /// `hashStruct(primaryType, message)`.
    pub fn message_hash(&self) -> Result<Hash, TypedDataError> {
        hash_struct(&self.primary_type, &self.message, &self.types)
    }

    /// The final 32-byte digest that gets signed.
    pub fn signing_hash(&self) -> Result<Hash, TypedDataError> {
        let mut buf = Vec::with_capacity(66);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(&self.domain_separator()?);
        buf.extend_from_slice(&self.message_hash()?);
        Ok(keccak256(&buf))
    }
}

// =============================================================================
// TYPE ENCODING
// =============================================================================

/// Strip array suffixes: `Allowance[][2]` -> `Allowance`.
fn base_type(ty: &str) -> &str {
    ty.find('[').map(|idx| &ty[..idx]).unwrap_or(ty)
}

fn collect_dependencies<'a>(
    ty: &'a str,
    types: &'a BTreeMap<String, Vec<TypedField>>,
    found: &mut BTreeSet<&'a str>,
) {
    let Some((name, fields)) = types.get_key_value(base_type(ty)) else {
        return;
    };
    if !found.insert(name.as_str()) {
        return;
    }
    for field in fields {
        collect_dependencies(&field.ty, types, found);
    }
}

/// `encodeType`: the primary type followed by its dependencies sorted by name.
pub fn encode_type(
    primary: &str,
    types: &BTreeMap<String, Vec<TypedField>>,
) -> Result<String, TypedDataError> {
    if !types.contains_key(primary) {
        return Err(TypedDataError::UnknownType(primary.to_string()));
    }
    let mut deps = BTreeSet::new();
    collect_dependencies(primary, types, &mut deps);
    deps.remove(primary);

    let mut out = String::new();
    for name in std::iter::once(primary).chain(deps) {
        let fields = types
            .get(name)
            .ok_or_else(|| TypedDataError::UnknownType(name.to_string()))?;
        let members: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", f.ty, f.name))
            .collect();
        out.push_str(name);
        out.push('(');
        out.push_str(&members.join(","));
        out.push(')');
    }
    Ok(out)
}

/// `typeHash`.
pub fn type_hash(
    primary: &str,
    types: &BTreeMap<String, Vec<TypedField>>,
) -> Result<Hash, TypedDataError> {
    Ok(keccak256(encode_type(primary, types)?.as_bytes()))
}

// =============================================================================
// DATA ENCODING
// =============================================================================

/// `hashStruct(s) = keccak256(typeHash || encodeData(s))`.
pub fn hash_struct(
    primary: &str,
    value: &Value,
    types: &BTreeMap<String, Vec<TypedField>>,
) -> Result<Hash, TypedDataError> {
    let fields = types
        .get(primary)
        .ok_or_else(|| TypedDataError::UnknownType(primary.to_string()))?;

    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(&type_hash(primary, types)?);
    for field in fields {
        let member = value
            .get(&field.name)
            .ok_or_else(|| TypedDataError::MissingField {
                ty: primary.to_string(),
                field: field.name.clone(),
            })?;
        buf.extend_from_slice(&encode_value(&field.ty, member, types)?);
    }
    Ok(keccak256(&buf))
}

fn invalid(ty: &str, reason: impl Into<String>) -> TypedDataError {
    TypedDataError::InvalidValue {
        ty: ty.to_string(),
        reason: reason.into(),
    }
}

fn encode_value(
    ty: &str,
    value: &Value,
    types: &BTreeMap<String, Vec<TypedField>>,
) -> Result<Hash, TypedDataError> {
    if let Some(open) = ty.rfind('[') {
        let inner = &ty[..open];
        let items = value
            .as_array()
            .ok_or_else(|| invalid(ty, "expected an array"))?;
        let mut buf = Vec::with_capacity(32 * items.len());
        for item in items {
            buf.extend_from_slice(&encode_value(inner, item, types)?);
        }
        return Ok(keccak256(&buf));
    }

    if types.contains_key(ty) {
        return hash_struct(ty, value, types);
    }

    match ty {
        "string" => {
            let s = value.as_str().ok_or_else(|| invalid(ty, "expected a string"))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&decode_hex(ty, value)?)),
        "bool" => {
            let b = value.as_bool().ok_or_else(|| invalid(ty, "expected a bool"))?;
            Ok(word_from_u256(U256::from(b as u8)))
        }
        "address" => {
            let s = value.as_str().ok_or_else(|| invalid(ty, "expected a hex string"))?;
            let address: Address = s.parse().map_err(|e| invalid(ty, format!("{e}")))?;
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(address.as_bytes());
            Ok(word)
        }
        _ => {
            if let Some(size) = ty.strip_prefix("bytes") {
                let size = parse_size(ty, size, 1, 32)?;
                let bytes = decode_hex(ty, value)?;
                if bytes.len() > size {
                    return Err(invalid(ty, format!("{} bytes exceeds {size}", bytes.len())));
                }
                let mut word = [0u8; 32];
                word[..bytes.len()].copy_from_slice(&bytes);
                Ok(word)
            } else if let Some(bits) = ty.strip_prefix("uint") {
                let bits = parse_size(ty, bits, 8, 256)?;
                let (negative, magnitude) = parse_integer(ty, value)?;
                if negative {
                    return Err(invalid(ty, "negative value for unsigned type"));
                }
                if magnitude.bits() > bits {
                    return Err(invalid(ty, "value out of range"));
                }
                Ok(word_from_u256(magnitude))
            } else if let Some(bits) = ty.strip_prefix("int") {
                let bits = parse_size(ty, bits, 8, 256)?;
                let (negative, magnitude) = parse_integer(ty, value)?;
                let limit = U256::one() << (bits - 1);
                let in_range = if negative {
                    magnitude <= limit
                } else {
                    magnitude < limit
                };
                if !in_range {
                    return Err(invalid(ty, "value out of range"));
                }
                let word = if negative && !magnitude.is_zero() {
                    // Two's complement over 256 bits.
                    (!magnitude).overflowing_add(U256::one()).0
                } else {
                    magnitude
                };
                Ok(word_from_u256(word))
            } else {
                Err(TypedDataError::UnknownType(ty.to_string()))
            }
        }
    }
}

fn parse_size(ty: &str, digits: &str, min: usize, max: usize) -> Result<usize, TypedDataError> {
    let size: usize = digits
        .parse()
        .map_err(|_| TypedDataError::UnknownType(ty.to_string()))?;
    if size < min || size > max {
        return Err(TypedDataError::UnknownType(ty.to_string()));
    }
    Ok(size)
}

fn decode_hex(ty: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    let s = value.as_str().ok_or_else(|| invalid(ty, "expected a hex string"))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| invalid(ty, e.to_string()))
}

/// Integers arrive as JSON numbers, decimal strings or `0x` hex strings.
fn parse_integer(ty: &str, value: &Value) -> Result<(bool, U256), TypedDataError> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok((false, U256::from(u)))
            } else if let Some(i) = n.as_i64() {
                Ok((i < 0, U256::from(i.unsigned_abs())))
            } else {
                Err(invalid(ty, "non-integer number"))
            }
        }
        Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            let magnitude = if let Some(hex_digits) = digits.strip_prefix("0x") {
                let padded = if hex_digits.len() % 2 == 1 {
                    format!("0{hex_digits}")
                } else {
                    hex_digits.to_string()
                };
                let bytes = hex::decode(padded).map_err(|e| invalid(ty, e.to_string()))?;
                if bytes.len() > 32 {
                    return Err(invalid(ty, "value out of range"));
                }
                U256::from_big_endian(&bytes)
            } else {
                U256::from_dec_str(digits).map_err(|e| invalid(ty, format!("{e:?}")))?
            };
            Ok((negative, magnitude))
        }
        _ => Err(invalid(ty, "expected an integer")),
    }
}

fn word_from_u256(value: U256) -> Hash {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}
