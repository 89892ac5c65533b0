// src/models/plan.rs

//! Fully resolved description of one adapter invocation.

use std::fmt;

use serde::Serialize;

/// Which adapter family serves the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Per-council adapter (external script or native client)
    GenericAdapter,
    /// Cross-council waste service API
    StandardizedApi,
}

/// Identifier slots of the adapter command-line contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flag {
    Uprn,
    Postcode,
    House,
}

impl Flag {
    pub fn as_cli(self) -> &'static str {
        match self {
            Flag::Uprn => "-u",
            Flag::Postcode => "-p",
            Flag::House => "-n",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cli())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchPlan {
    pub strategy: Strategy,

    /// Target URL passed positionally to the adapter
    pub target_url: Option<String>,

    /// Ordered identifier arguments
    pub identifier_args: Vec<(Flag, String)>,

    /// Council-specific flags appended verbatim (e.g. `-s`)
    pub extra_flags: Vec<String>,

    pub used_placeholder_postcode: bool,
}

impl DispatchPlan {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            target_url: None,
            identifier_args: Vec::new(),
            extra_flags: Vec::new(),
            used_placeholder_postcode: false,
        }
    }

    pub fn arg(mut self, flag: Flag, value: impl Into<String>) -> Self {
        self.identifier_args.push((flag, value.into()));
        self
    }

    pub fn value(&self, flag: Flag) -> Option<&str> {
        self.identifier_args
            .iter()
            .find(|(f, _)| *f == flag)
            .map(|(_, v)| v.as_str())
    }

    pub fn uprn(&self) -> Option<&str> {
        self.value(Flag::Uprn)
    }

    pub fn postcode(&self) -> Option<&str> {
        self.value(Flag::Postcode)
    }

    pub fn house(&self) -> Option<&str> {
        self.value(Flag::House)
    }

    /// Command-line arguments after the council name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(url) = &self.target_url {
            args.push(url.clone());
        }
        for (flag, value) in &self.identifier_args {
            args.push(flag.as_cli().to_string());
            args.push(value.clone());
        }
        args.extend(self.extra_flags.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_args_order() {
        let mut plan = DispatchPlan::new(Strategy::GenericAdapter)
            .arg(Flag::Uprn, "100120992798")
            .arg(Flag::Postcode, "SN8 1RA");
        plan.target_url = Some("https://example.gov.uk/bins".into());
        plan.extra_flags.push("-s".into());

        assert_eq!(
            plan.to_args(),
            vec![
                "https://example.gov.uk/bins",
                "-u",
                "100120992798",
                "-p",
                "SN8 1RA",
                "-s"
            ]
        );
        assert_eq!(plan.postcode(), Some("SN8 1RA"));
        assert_eq!(plan.house(), None);
    }
}
