//! Property-based tests using proptest
//!
//! These tests verify the launch source precedence chain and the AL1
//! classification patterns against randomized inputs.

use al1_finder::audit::group::{resolve_launch_source, LaunchSource};
use al1_finder::audit::matcher;
use al1_finder::aws::provider::{
    GroupDescriptor, LaunchTemplateSpec, MixedInstancesPolicyDescriptor, OverrideDescriptor,
};
use proptest::prelude::*;

fn arb_spec() -> impl Strategy<Value = LaunchTemplateSpec> {
    ("[a-z]{1,8}", "[0-9]{1,2}").prop_map(|(name, version)| LaunchTemplateSpec {
        id: None,
        name,
        version,
    })
}

/// Generate an arbitrary group shape plus an optional override being
/// projected, covering every combination of present/absent launch sources.
fn arb_group() -> impl Strategy<Value = (GroupDescriptor, Option<OverrideDescriptor>)> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(arb_spec()),
        proptest::option::of(proptest::option::of(arb_spec())),
        proptest::option::of(proptest::option::of(arb_spec())),
    )
        .prop_map(|(configuration, direct, policy, override_)| {
            let group = GroupDescriptor {
                name: "asg".to_string(),
                launch_configuration_name: configuration,
                launch_template: direct,
                mixed_instances_policy: policy.map(|top| MixedInstancesPolicyDescriptor {
                    launch_template: top,
                    overrides: vec![],
                }),
            };
            let override_ = override_.map(|spec| OverrideDescriptor {
                launch_template: spec,
            });
            (group, override_)
        })
}

proptest! {
    /// The 4-level precedence chain never falls through to a lower level
    /// while a higher one is populated, and errors only when every level
    /// is empty.
    #[test]
    fn precedence_is_exact((group, override_) in arb_group()) {
        let result = resolve_launch_source(&group, override_.as_ref());

        if let Some(name) = &group.launch_configuration_name {
            prop_assert_eq!(result.unwrap(), LaunchSource::LaunchConfiguration(name));
        } else if let Some(spec) = override_.as_ref().and_then(|o| o.launch_template.as_ref()) {
            prop_assert_eq!(result.unwrap(), LaunchSource::LaunchTemplate(spec));
        } else if let Some(spec) = group
            .mixed_instances_policy
            .as_ref()
            .and_then(|p| p.launch_template.as_ref())
        {
            prop_assert_eq!(result.unwrap(), LaunchSource::LaunchTemplate(spec));
        } else if let Some(spec) = group.launch_template.as_ref() {
            prop_assert_eq!(result.unwrap(), LaunchSource::LaunchTemplate(spec));
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// Only 2014-2018 release years match the image description pattern
    #[test]
    fn description_year_gates_the_match(year in 2000u32..2030, suffix in "[ a-zA-Z0-9.]{0,10}") {
        let description = format!("Amazon Linux AMI {year}.09{suffix}");
        prop_assert_eq!(
            matcher::matches_image_description(&description),
            (2014..=2018).contains(&year)
        );
    }

    /// Only 2011-2018 release years match the console banner pattern
    #[test]
    fn console_banner_year_gates_the_match(
        year in 2000u32..2030,
        minor in proptest::option::of(0u32..100),
    ) {
        let release = match minor {
            Some(minor) => format!("{year}.{minor}"),
            None => year.to_string(),
        };
        let log = format!("cloud-init boot\nAmazon Linux AMI release {release}\nKernel 4.1.1\n");
        prop_assert_eq!(
            matcher::matches_console_output(&log),
            (2011..=2018).contains(&year)
        );
    }

    /// The banner only counts at the start of a line
    #[test]
    fn console_banner_requires_line_start(prefix in "[a-z]{1,8}") {
        let log = format!("{prefix}Amazon Linux AMI release 2017.09\nKernel 4.9");
        prop_assert!(!matcher::matches_console_output(&log));
    }
}
