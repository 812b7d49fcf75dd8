//! The `Policy` typed-data message answered during `auth_verify`.
//!
//! ```text
//! Policy(string challenge,string scope,address wallet,address application,
//!        address participant,uint256 expire,Allowance[] allowances)
//! Allowance(string asset,uint256 amount)
//! ```
//!
//! Signed by the identity (wallet) key under the domain `{ name: app_name }`.

use super::eip712::{Eip712Domain, TypedData, TypedField};
use serde_json::json;
use shared_types::{Address, AuthRequestParams};
use std::collections::BTreeMap;

pub const POLICY_TYPE: &str = "Policy";
pub const ALLOWANCE_TYPE: &str = "Allowance";

fn policy_types() -> BTreeMap<String, Vec<TypedField>> {
    let mut types = BTreeMap::new();
    types.insert(
        POLICY_TYPE.to_string(),
        vec![
            TypedField::new("challenge", "string"),
            TypedField::new("scope", "string"),
            TypedField::new("wallet", "address"),
            TypedField::new("application", "address"),
            TypedField::new("participant", "address"),
            TypedField::new("expire", "uint256"),
            TypedField::new("allowances", "Allowance[]"),
        ],
    );
    types.insert(
        ALLOWANCE_TYPE.to_string(),
        vec![
            TypedField::new("asset", "string"),
            TypedField::new("amount", "uint256"),
        ],
    );
    types
}

/// Typed data binding `challenge` to the declared session key and allowances.
///
/// Absent optional parameters take the values the broker assumes for them:
/// `expire = 0`, `scope = ""`, `application = 0x0`.
pub fn auth_typed_data(params: &AuthRequestParams, challenge: &str) -> TypedData {
    let application = params.application.unwrap_or(Address::ZERO);
    let expire = params.expire.clone().unwrap_or_else(|| "0".to_string());
    let scope = params.scope.clone().unwrap_or_default();

    TypedData {
        domain: Eip712Domain::named(params.app_name.clone()),
        types: policy_types(),
        primary_type: POLICY_TYPE.to_string(),
        message: json!({
            "challenge": challenge,
            "scope": scope,
            "wallet": params.wallet,
            "application": application,
            "participant": params.participant,
            "expire": expire,
            "allowances": params.allowances,
        }),
    }
}
