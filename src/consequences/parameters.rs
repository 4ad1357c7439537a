// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::filter::FilterId;
use crate::value::Value;
use crate::variables::VariableHolder;

use std::net::IpAddr;
use std::rc::Rc;

/// Who did what to which page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionContext {
    pub action: String,
    pub user_name: String,
    /// 0 for anonymous users.
    pub user_id: u64,
    pub ip: Option<IpAddr>,
    pub user_registration: Option<String>,
    pub user_editcount: i64,
    pub page: String,
}

impl ActionContext {
    /// Reads the context from the concrete variables of an action. The user
    /// name of an anonymous user is its address. The account id (0 for
    /// anonymous users) and registration timestamp are not filter variables
    /// and come from the host.
    pub fn from_vars(
        holder: &VariableHolder,
        user_id: u64,
        user_registration: Option<String>,
    ) -> Self {
        let values = holder.values();
        let string = |name: &str| {
            values
                .get(name)
                .map(Value::to_af_string)
                .unwrap_or_default()
        };
        let user_name = string("user_name");
        Self {
            action: string("action"),
            ip: user_name.parse().ok(),
            user_editcount: values.get("user_editcount").map(Value::to_int).unwrap_or(0),
            page: string("page_prefixedtitle"),
            user_name,
            user_id,
            user_registration,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.user_id != 0
    }
}

/// Data shared by every consequence of one matched filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub filter: FilterId,
    pub filter_name: String,
    pub action: Rc<ActionContext>,
}

impl Parameters {
    pub fn is_global_filter(&self) -> bool {
        self.filter.global
    }
}

/// CIDR notation of the network of `ip` with the given prefix lengths.
pub fn range_of(ip: IpAddr, ipv4_prefix: u8, ipv6_prefix: u8) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let prefix = ipv4_prefix.min(32);
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            let net = std::net::Ipv4Addr::from(u32::from(v4) & mask);
            format!("{net}/{prefix}")
        }
        IpAddr::V6(v6) => {
            let prefix = ipv6_prefix.min(128);
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            let net = std::net::Ipv6Addr::from(u128::from(v6) & mask);
            format!("{net}/{prefix}")
        }
    }
}
