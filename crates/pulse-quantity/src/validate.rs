//! Advisory checks over request/limit pairs.
//!
//! Validation never fails: every finding is an [`Advisory`] the caller can
//! attach to whatever it is aggregating.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::quantity::{Quantity, Resource, parse};

const GIB: f64 = 1_073_741_824.0;

/// CPU request above which an advisory is raised (cores).
pub const CPU_REQUEST_CEILING: f64 = 8.0;
/// CPU limit above which an advisory is raised (cores).
pub const CPU_LIMIT_CEILING: f64 = 16.0;
/// Memory request above which an advisory is raised (bytes).
pub const MEMORY_REQUEST_CEILING: f64 = 32.0 * GIB;
/// Memory limit above which an advisory is raised (bytes).
pub const MEMORY_LIMIT_CEILING: f64 = 64.0 * GIB;

/// Which side of a request/limit pair an advisory refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitField {
    /// The resource request.
    Request,
    /// The resource limit.
    Limit,
}

impl fmt::Display for LimitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Limit => f.write_str("limit"),
        }
    }
}

/// A non-fatal finding about a request/limit pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "advisory", rename_all = "snake_case")]
pub enum Advisory {
    /// The request is larger than the limit.
    RequestExceedsLimit {
        /// Resource concerned.
        resource: Resource,
        /// Raw request string.
        request: String,
        /// Raw limit string.
        limit: String,
    },
    /// No limit is set.
    MissingLimit {
        /// Resource concerned.
        resource: Resource,
    },
    /// A value could not be used as a number.
    Unparseable {
        /// Resource concerned.
        resource: Resource,
        /// Request or limit.
        field: LimitField,
        /// Raw input.
        input: String,
    },
    /// A value is larger than is plausible for a single container.
    Oversized {
        /// Resource concerned.
        resource: Resource,
        /// Request or limit.
        field: LimitField,
        /// Raw input.
        input: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestExceedsLimit {
                resource,
                request,
                limit,
            } => write!(f, "{resource} request ({request}) exceeds limit ({limit})"),
            Self::MissingLimit { resource } => write!(f, "{resource} limit is not set"),
            Self::Unparseable {
                resource,
                field,
                input,
            } => write!(f, "{resource} {field} '{input}' is not a valid quantity"),
            Self::Oversized {
                resource,
                field,
                input,
            } => write!(f, "{resource} {field} is unusually large: {input}"),
        }
    }
}

/// Checks one resource's request against its limit.
#[must_use]
pub fn validate_limits(
    resource: Resource,
    request: Option<&str>,
    limit: Option<&str>,
) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    let request = request.map(str::trim).filter(|s| !s.is_empty());
    let limit = limit.map(str::trim).filter(|s| !s.is_empty());

    let parsed_request =
        request.and_then(|raw| checked(resource, LimitField::Request, raw, &mut advisories));
    let parsed_limit = match limit {
        Some(raw) => checked(resource, LimitField::Limit, raw, &mut advisories),
        None => {
            advisories.push(Advisory::MissingLimit { resource });
            None
        }
    };

    if let (Some(req), Some(lim), Some(raw_req), Some(raw_lim)) =
        (parsed_request, parsed_limit, request, limit)
    {
        if req.value() > lim.value() {
            advisories.push(Advisory::RequestExceedsLimit {
                resource,
                request: raw_req.to_string(),
                limit: raw_lim.to_string(),
            });
        }
    }

    advisories
}

/// Checks CPU and memory across a container's request and limit maps.
///
/// Other resource names (`ephemeral-storage`, extended resources) are ignored.
#[must_use]
pub fn validate_requirements(
    requests: &BTreeMap<String, String>,
    limits: &BTreeMap<String, String>,
) -> Vec<Advisory> {
    [Resource::Cpu, Resource::Memory]
        .into_iter()
        .flat_map(|resource| {
            validate_limits(
                resource,
                requests.get(resource.as_str()).map(String::as_str),
                limits.get(resource.as_str()).map(String::as_str),
            )
        })
        .collect()
}

/// Parses one side and records unparseable or oversized values.
fn checked(
    resource: Resource,
    field: LimitField,
    raw: &str,
    advisories: &mut Vec<Advisory>,
) -> Option<Quantity> {
    let quantity = parse(raw, resource);
    if quantity.is_anomalous() {
        advisories.push(Advisory::Unparseable {
            resource,
            field,
            input: raw.to_string(),
        });
        return None;
    }

    let ceiling = match (resource, field) {
        (Resource::Cpu, LimitField::Request) => CPU_REQUEST_CEILING,
        (Resource::Cpu, LimitField::Limit) => CPU_LIMIT_CEILING,
        (Resource::Memory, LimitField::Request) => MEMORY_REQUEST_CEILING,
        (Resource::Memory, LimitField::Limit) => MEMORY_LIMIT_CEILING,
    };
    if quantity.value() > ceiling {
        advisories.push(Advisory::Oversized {
            resource,
            field,
            input: raw.to_string(),
        });
    }

    Some(quantity)
}
