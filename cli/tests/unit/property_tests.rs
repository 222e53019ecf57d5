//! Property-based tests for the convergence decision core and the vendor
//! naming scheme.
//!
//! Uses `proptest` to verify invariants across many random host states.

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use semver::Version;

use warden_cli::domain::agent::{
    AgentVariant, checksum_url, package_name, package_url, parse_version_banner,
};
use warden_cli::domain::plan::{Action, plan};
use warden_cli::domain::state::{DesiredAgentState, ObservedAgentState, VariantObservation};

// ============================================================================
// Strategies
// ============================================================================

fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..9, 0u64..9, 0u64..9).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

fn arb_variant() -> impl Strategy<Value = AgentVariant> {
    prop_oneof![Just(AgentVariant::V1), Just(AgentVariant::V2)]
}

fn arb_observation() -> impl Strategy<Value = VariantObservation> {
    (proptest::option::of(arb_version()), any::<bool>()).prop_map(
        |(installed, service_registered)| VariantObservation {
            installed,
            service_registered,
        },
    )
}

fn arb_observed() -> impl Strategy<Value = ObservedAgentState> {
    (arb_observation(), arb_observation(), any::<bool>()).prop_map(
        |(v1, v2, package_cached)| ObservedAgentState {
            v1,
            v2,
            package_cached,
        },
    )
}

fn arb_desired() -> impl Strategy<Value = DesiredAgentState> {
    (arb_variant(), proptest::option::of(arb_version()))
        .prop_map(|(variant, version)| DesiredAgentState { variant, version })
}

/// Execution phase of an action; plans must be sorted by phase.
fn phase(action: Action) -> u8 {
    match action {
        Action::StopService(_) => 0,
        Action::Uninstall(_) => 1,
        Action::RemoveInstallDir => 2,
        Action::CreateInstallDir => 3,
        Action::Download => 4,
        Action::Unpack => 5,
        Action::PlaceBinaries(_) => 6,
        Action::RegisterService(_) => 7,
    }
}

// ============================================================================
// plan() invariants
// ============================================================================

proptest! {
    /// Every plan creates the install directory exactly once.
    #[test]
    fn prop_plan_creates_install_dir_exactly_once(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        let creates = pending
            .actions
            .iter()
            .filter(|a| matches!(a, Action::CreateInstallDir))
            .count();
        prop_assert_eq!(creates, 1);
    }

    /// Actions appear in strict phase order: teardown, directories,
    /// acquisition, placement, registration.
    #[test]
    fn prop_plan_actions_are_phase_ordered(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        let phases: Vec<u8> = pending.actions.iter().map(|&a| phase(a)).collect();
        let mut sorted = phases.clone();
        sorted.sort_unstable();
        prop_assert_eq!(phases, sorted);
    }

    /// A plan is converged exactly when it would not mutate the host.
    #[test]
    fn prop_converged_plans_have_no_destructive_steps(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        prop_assert_eq!(pending.is_converged(), !pending.has_destructive_steps());
    }

    /// A cached package suppresses all acquisition work.
    #[test]
    fn prop_cached_package_never_downloads(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        prop_assume!(observed.package_cached);
        let pending = plan(&observed, &desired);
        prop_assert!(!pending.actions.contains(&Action::Download));
        prop_assert!(!pending.actions.contains(&Action::Unpack));
    }

    /// Download never appears without Unpack right after it and a
    /// placement step later.
    #[test]
    fn prop_download_is_always_followed_by_unpack_and_place(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        if let Some(at) = pending.actions.iter().position(|a| *a == Action::Download) {
            prop_assert_eq!(pending.actions.get(at + 1), Some(&Action::Unpack));
            prop_assert!(
                pending
                    .actions
                    .contains(&Action::PlaceBinaries(desired.variant))
            );
        }
    }

    /// Services are only ever stopped when the observation saw them
    /// registered, and every stop is paired with an uninstall.
    #[test]
    fn prop_stop_and_uninstall_require_a_registered_service(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        let stopped: Vec<AgentVariant> = pending
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::StopService(v) => Some(*v),
                _ => None,
            })
            .collect();
        let uninstalled: Vec<AgentVariant> = pending
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Uninstall(v) => Some(*v),
                _ => None,
            })
            .collect();
        for v in &stopped {
            prop_assert!(observed.variant(*v).service_registered);
        }
        prop_assert_eq!(stopped, uninstalled);
    }

    /// Placement and registration only ever target the desired variant.
    #[test]
    fn prop_install_steps_target_only_the_desired_variant(
        observed in arb_observed(),
        desired in arb_desired(),
    ) {
        let pending = plan(&observed, &desired);
        for action in &pending.actions {
            if let Action::PlaceBinaries(v) | Action::RegisterService(v) = action {
                prop_assert_eq!(*v, desired.variant);
            }
        }
    }
}

// ============================================================================
// Vendor naming scheme
// ============================================================================

proptest! {
    /// Package URLs always follow `<base>/<major.minor>/<version>/<name>`,
    /// with or without a trailing slash on the base.
    #[test]
    fn prop_package_url_follows_the_vendor_layout(
        host in "[a-z]{3,10}",
        variant in arb_variant(),
        version in arb_version(),
    ) {
        let base = format!("https://{host}.example.io/stable");
        let url = package_url(&base, variant, &version).expect("supported test platform");
        let name = package_name(variant, &version).expect("supported test platform");

        prop_assert!(url.starts_with(&base));
        let segment = format!("/{}.{}/{}/", version.major, version.minor, version);
        prop_assert!(url.contains(&segment));
        prop_assert!(url.ends_with(&name));
        let path = url.trim_start_matches("https://");
        prop_assert!(!path.contains("//"), "double slash in {url}");

        let slashed = package_url(&format!("{base}/"), variant, &version)
            .expect("supported test platform");
        prop_assert_eq!(&slashed, &url);

        prop_assert_eq!(checksum_url(&url), format!("{url}.sha256"));
    }

    /// Package names embed the variant base, the full version, and the
    /// archive suffix.
    #[test]
    fn prop_package_name_embeds_variant_and_version(
        variant in arb_variant(),
        version in arb_version(),
    ) {
        let name = package_name(variant, &version).expect("supported test platform");
        prop_assert!(name.starts_with(variant.package_base()));
        prop_assert!(name.contains(&version.to_string()));
        prop_assert!(name.ends_with(".tar.gz"));
    }

    /// Version banners from either generation parse back to the version
    /// they embed, revision suffix or not.
    #[test]
    fn prop_version_banner_round_trips(
        program in "[a-z]{2,10}",
        version in arb_version(),
        revision in proptest::option::of("[0-9a-f]{7}"),
    ) {
        let banner = match revision {
            Some(rev) => format!("{program} (Sentinel Agent) {version} (revision {rev})\n"),
            None => format!("{program} (Sentinel Agent) {version}\ncompiled with OpenSSL\n"),
        };
        prop_assert_eq!(parse_version_banner(&banner), Some(version));
    }

    /// Instance scoping changes the service name but never collides the
    /// two generations.
    #[test]
    fn prop_instance_scoping_keeps_generations_distinct(
        instance in "[a-z][a-z0-9-]{0,11}",
    ) {
        let scoped_v1 = AgentVariant::V1.service_name(Some(&instance));
        let scoped_v2 = AgentVariant::V2.service_name(Some(&instance));
        prop_assert_ne!(&scoped_v1, &scoped_v2);
        prop_assert!(scoped_v1.contains(&instance));
        prop_assert_ne!(scoped_v1, AgentVariant::V1.service_name(None));

        let display = AgentVariant::V1.display_name(Some(&instance));
        prop_assert!(display.contains(&instance));
    }
}
