// src/services/dispatch.rs

//! Dispatch builder.
//!
//! Turns a parsed intent and a council profile into the concrete adapter
//! invocation. Council quirks come only from the [`CouncilProfile`]
//! override entry; the decision table below is the same for every council.

use crate::error::{AppError, Result};
use crate::models::council::display_name;
use crate::models::{CouncilProfile, DispatchPlan, Flag, Integration, ParsedIntent, Strategy};

/// Builds [`DispatchPlan`]s.
#[derive(Debug, Clone)]
pub struct DispatchBuilder {
    placeholder_postcode: String,
}

impl DispatchBuilder {
    pub fn new(placeholder_postcode: impl Into<String>) -> Self {
        Self {
            placeholder_postcode: placeholder_postcode.into(),
        }
    }

    /// Build the plan for one request.
    ///
    /// `resolved` is the UPRN found by the address resolver, if it ran and
    /// succeeded.
    pub fn build(
        &self,
        intent: &ParsedIntent,
        council: &CouncilProfile,
        resolved: Option<&str>,
    ) -> Result<DispatchPlan> {
        if council.integration == Integration::StandardApi {
            return Self::standard_api(intent, council, resolved);
        }

        let mut plan = DispatchPlan::new(Strategy::GenericAdapter);

        if let Some(uprn) = &intent.uprn {
            plan = plan.arg(Flag::Uprn, uprn);
            match &intent.postcode {
                Some(postcode) => plan = plan.arg(Flag::Postcode, postcode),
                None if council.requires_postcode => {
                    return Err(AppError::input(
                        format!(
                            "{} needs a postcode as well as the UPRN",
                            display_name(&council.id)
                        ),
                        Some("Enter the postcode after the UPRN, e.g. '100120992798 SN8 1RA'."),
                    ));
                }
                None => {
                    plan = plan.arg(Flag::Postcode, &self.placeholder_postcode);
                    plan.used_placeholder_postcode = true;
                }
            }
        } else if let (Some(postcode), Some(house), false) =
            (&intent.postcode, &intent.house_identifier, intent.fallback)
        {
            plan = match resolved {
                Some(uprn) => plan.arg(Flag::Uprn, uprn).arg(Flag::Postcode, postcode),
                None => plan.arg(Flag::Postcode, postcode).arg(Flag::House, house),
            };
        } else if let Some(postcode) = &intent.postcode {
            // Postcode alone, or the unmatched text verbatim.
            plan = plan.arg(Flag::Postcode, postcode);
        }

        plan.target_url = council.default_url.clone().or_else(|| intent.url.clone());
        plan.extra_flags = council.extra_flags.clone();

        log::debug!(
            "Dispatch for {}: {:?} args={:?} placeholder={}",
            council.id,
            plan.strategy,
            plan.identifier_args,
            plan.used_placeholder_postcode
        );
        Ok(plan)
    }

    fn standard_api(
        intent: &ParsedIntent,
        council: &CouncilProfile,
        resolved: Option<&str>,
    ) -> Result<DispatchPlan> {
        let url = council.default_url.as_ref().or(intent.url.as_ref());
        let uprn = intent.uprn.as_deref().or(resolved);

        let (url, uprn) = match (url, uprn) {
            (Some(url), Some(uprn)) => (url, uprn),
            (None, _) => {
                return Err(AppError::input(
                    "The waste service API needs the council's API URL",
                    Some("Enter the API URL followed by your UPRN."),
                ));
            }
            (Some(_), None) => {
                return Err(AppError::input(
                    "The waste service API needs a UPRN",
                    Some("Enter your UPRN, or your house number and postcode, after the URL."),
                ));
            }
        };

        let mut plan = DispatchPlan::new(Strategy::StandardizedApi).arg(Flag::Uprn, uprn);
        plan.target_url = Some(url.clone());
        plan.extra_flags = council.extra_flags.clone();
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::parser::parse;

    const PLACEHOLDER: &str = "ZZ1 1ZZ";

    fn builder() -> DispatchBuilder {
        DispatchBuilder::new(PLACEHOLDER)
    }

    fn wiltshire() -> CouncilProfile {
        CouncilProfile {
            requires_postcode: true,
            integration: Integration::Wiltshire,
            ..CouncilProfile::script("WiltshireCouncil")
        }
    }

    fn standard() -> CouncilProfile {
        CouncilProfile {
            integration: Integration::StandardApi,
            ..CouncilProfile::script("WasteServiceStandard")
        }
    }

    #[test]
    fn test_resolved_uprn_uses_real_postcode() {
        let plan = builder()
            .build(&parse("10 SN8 1RA"), &wiltshire(), Some("100120992798"))
            .unwrap();
        assert_eq!(plan.strategy, Strategy::GenericAdapter);
        assert_eq!(plan.uprn(), Some("100120992798"));
        assert_eq!(plan.postcode(), Some("SN8 1RA"));
        assert_eq!(plan.house(), None);
        assert!(!plan.used_placeholder_postcode);
    }

    #[test]
    fn test_unresolved_house_passes_both_arguments() {
        let plan = builder()
            .build(&parse("10 SN8 1RA"), &CouncilProfile::script("LeedsCityCouncil"), None)
            .unwrap();
        assert_eq!(
            plan.identifier_args,
            vec![
                (Flag::Postcode, "SN8 1RA".to_string()),
                (Flag::House, "10".to_string())
            ]
        );
    }

    #[test]
    fn test_uprn_alone_uses_placeholder() {
        let plan = builder()
            .build(&parse("100120992798"), &CouncilProfile::script("LeedsCityCouncil"), None)
            .unwrap();
        assert_eq!(plan.uprn(), Some("100120992798"));
        assert_eq!(plan.postcode(), Some(PLACEHOLDER));
        assert!(plan.used_placeholder_postcode);
    }

    #[test]
    fn test_uprn_alone_rejected_when_postcode_required() {
        let err = builder()
            .build(&parse("100120992798"), &wiltshire(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputError);
        assert!(err.hint().is_some());
        assert!(err.to_string().contains("Wiltshire Council"));
    }

    #[test]
    fn test_postcode_only() {
        let plan = builder()
            .build(&parse("SN8 1RA"), &CouncilProfile::script("LeedsCityCouncil"), None)
            .unwrap();
        assert_eq!(plan.identifier_args, vec![(Flag::Postcode, "SN8 1RA".to_string())]);
        assert_eq!(plan.target_url, None);
    }

    #[test]
    fn test_unmatched_text_passes_verbatim() {
        let plan = builder()
            .build(&parse("Rose Cottage"), &CouncilProfile::script("LeedsCityCouncil"), None)
            .unwrap();
        assert_eq!(plan.postcode(), Some("Rose Cottage"));
        assert!(!plan.used_placeholder_postcode);
    }

    #[test]
    fn test_url_with_house_name_keeps_text() {
        let plan = builder()
            .build(
                &parse("https://leeds.gov.uk/bins Rose Cottage"),
                &CouncilProfile::script("LeedsCityCouncil"),
                None,
            )
            .unwrap();
        assert_eq!(
            plan.to_args(),
            vec![
                "https://leeds.gov.uk/bins",
                "-p",
                "https://leeds.gov.uk/bins Rose Cottage"
            ]
        );
    }

    #[test]
    fn test_user_url_becomes_target() {
        let plan = builder()
            .build(
                &parse("https://leeds.gov.uk/bins SN8 1RA"),
                &CouncilProfile::script("LeedsCityCouncil"),
                None,
            )
            .unwrap();
        assert_eq!(plan.target_url.as_deref(), Some("https://leeds.gov.uk/bins"));
    }

    #[test]
    fn test_override_forces_url_and_flags() {
        let council = CouncilProfile {
            default_url: Some("https://fixed.example.gov.uk/".into()),
            extra_flags: vec!["-s".into()],
            ..CouncilProfile::script("ValeofGlamorganCouncil")
        };
        let plan = builder()
            .build(&parse("https://user.example.com/x CF62 4AB"), &council, None)
            .unwrap();
        assert_eq!(plan.target_url.as_deref(), Some("https://fixed.example.gov.uk/"));
        assert_eq!(plan.extra_flags, vec!["-s".to_string()]);
    }

    #[test]
    fn test_standard_api_requires_url_and_uprn() {
        let ok = builder()
            .build(&parse("https://api.council.gov.uk/ 100120992798"), &standard(), None)
            .unwrap();
        assert_eq!(ok.strategy, Strategy::StandardizedApi);
        assert_eq!(ok.target_url.as_deref(), Some("https://api.council.gov.uk/"));
        assert_eq!(ok.uprn(), Some("100120992798"));

        let resolved = builder()
            .build(
                &parse("https://api.council.gov.uk/ 10 SN8 1RA"),
                &standard(),
                Some("100120992798"),
            )
            .unwrap();
        assert_eq!(resolved.uprn(), Some("100120992798"));

        let no_url = builder()
            .build(&parse("100120992798"), &standard(), None)
            .unwrap_err();
        assert_eq!(no_url.kind(), ErrorKind::InputError);

        let no_uprn = builder()
            .build(&parse("https://api.council.gov.uk/ SN8 1RA"), &standard(), None)
            .unwrap_err();
        assert_eq!(no_uprn.kind(), ErrorKind::InputError);
    }
}
