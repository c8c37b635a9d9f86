//! Environment gates: preconditions checked once before an instance mounts.
//!
//! Each gate attribute holds a list of entries separated by commas or
//! whitespace. An entry prefixed with `!` excludes a value. A gate passes when
//! no excluded entry matches and, if any plain entries exist, at least one of
//! them matches. Protocol and device class compare whole values; OS and
//! browser compare by case-insensitive substring.

use std::fmt;

use crate::config::Environment;
use crate::dom::NodeData;

/// The gate kinds, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Protocol,
    Environment,
    Os,
    Browser,
}

impl Gate {
    pub const ORDER: [Gate; 4] = [Gate::Protocol, Gate::Environment, Gate::Os, Gate::Browser];

    /// The attribute holding this gate's entries.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Environment => "environment",
            Self::Os => "os",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Gate attributes read from a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateSet {
    pub protocol: Option<String>,
    pub environment: Option<String>,
    pub os: Option<String>,
    pub browser: Option<String>,
}

impl GateSet {
    pub fn from_node(data: &NodeData) -> Self {
        Self {
            protocol: data.attribute(Gate::Protocol.attribute()),
            environment: data.attribute(Gate::Environment.attribute()),
            os: data.attribute(Gate::Os.attribute()),
            browser: data.attribute(Gate::Browser.attribute()),
        }
    }

    fn spec(&self, gate: Gate) -> Option<&str> {
        match gate {
            Gate::Protocol => self.protocol.as_deref(),
            Gate::Environment => self.environment.as_deref(),
            Gate::Os => self.os.as_deref(),
            Gate::Browser => self.browser.as_deref(),
        }
    }

    /// Evaluate every gate in order, returning the first one that fails.
    pub fn evaluate(&self, env: &Environment) -> Result<(), Gate> {
        for gate in Gate::ORDER {
            let Some(spec) = self.spec(gate) else { continue };
            let passes = match gate {
                Gate::Protocol => check(spec, |entry| {
                    entry.trim_end_matches(':').eq_ignore_ascii_case(&env.protocol)
                }),
                Gate::Environment => check(spec, |entry| entry.eq_ignore_ascii_case(env.device.as_str())),
                Gate::Os => check(spec, |entry| contains_ignore_case(&env.os, entry)),
                Gate::Browser => check(spec, |entry| contains_ignore_case(&env.browser, entry)),
            };
            if !passes {
                return Err(gate);
            }
        }
        Ok(())
    }
}

fn check(spec: &str, matches: impl Fn(&str) -> bool) -> bool {
    let mut wanted = false;
    let mut any_wanted = false;
    for entry in spec.split(|c: char| c == ',' || c.is_whitespace()).filter(|e| !e.is_empty()) {
        match entry.strip_prefix('!') {
            Some(excluded) => {
                if matches(excluded) {
                    return false;
                }
            }
            None => {
                any_wanted = true;
                wanted |= matches(entry);
            }
        }
    }
    wanted || !any_wanted
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}
