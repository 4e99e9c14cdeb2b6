//! Built-in regression suite.
//!
//! Every case is composed on a [`CompositionStack`]: dimension, then feature
//! group, then the variant itself. Traces are unique per variant, which keeps
//! identities (and therefore test directories) distinct.

use super::case::Case;
use super::params::ParameterSet;
use super::stack::{CompositionStack, create_case};
use crate::params;

fn one_dimensional() -> ParameterSet {
    params! {
        "m" => 299, "n" => 0, "p" => 0,
        "x_domain%beg" => 0.0, "x_domain%end" => 1.0,
        "bc_x%beg" => -3, "bc_x%end" => -3,
        "patch_icpp(1)%geometry" => 1,
        "patch_icpp(1)%x_centroid" => 0.05, "patch_icpp(1)%length_x" => 0.1,
        "patch_icpp(1)%vel(1)" => 0.0,
        "patch_icpp(2)%geometry" => 1,
        "patch_icpp(2)%x_centroid" => 0.45, "patch_icpp(2)%length_x" => 0.7,
        "patch_icpp(2)%vel(1)" => 0.0,
        "patch_icpp(3)%geometry" => 1,
        "patch_icpp(3)%x_centroid" => 0.9, "patch_icpp(3)%length_x" => 0.2,
        "patch_icpp(3)%vel(1)" => 0.0,
    }
}

fn two_dimensional() -> ParameterSet {
    params! {
        "m" => 49, "n" => 39, "p" => 0,
        "x_domain%beg" => 0.0, "x_domain%end" => 1.0,
        "y_domain%beg" => 0.0, "y_domain%end" => 1.0,
        "bc_x%beg" => -3, "bc_x%end" => -3,
        "bc_y%beg" => -3, "bc_y%end" => -3,
        "patch_icpp(1)%geometry" => 3,
        "patch_icpp(1)%x_centroid" => 0.05, "patch_icpp(1)%length_x" => 0.1,
        "patch_icpp(1)%y_centroid" => 0.5, "patch_icpp(1)%length_y" => 1.0,
        "patch_icpp(2)%geometry" => 3,
        "patch_icpp(2)%x_centroid" => 0.45, "patch_icpp(2)%length_x" => 0.7,
        "patch_icpp(2)%y_centroid" => 0.5, "patch_icpp(2)%length_y" => 1.0,
        "patch_icpp(3)%geometry" => 3,
        "patch_icpp(3)%x_centroid" => 0.9, "patch_icpp(3)%length_x" => 0.2,
        "patch_icpp(3)%y_centroid" => 0.5, "patch_icpp(3)%length_y" => 1.0,
    }
}

fn three_dimensional() -> ParameterSet {
    params! {
        "m" => 24, "n" => 24, "p" => 24,
        "x_domain%beg" => 0.0, "x_domain%end" => 1.0,
        "y_domain%beg" => 0.0, "y_domain%end" => 1.0,
        "z_domain%beg" => 0.0, "z_domain%end" => 1.0,
        "bc_x%beg" => -3, "bc_x%end" => -3,
        "bc_y%beg" => -3, "bc_y%end" => -3,
        "bc_z%beg" => -3, "bc_z%end" => -3,
        "patch_icpp(1)%geometry" => 9,
        "patch_icpp(1)%x_centroid" => 0.05, "patch_icpp(1)%length_x" => 0.1,
        "patch_icpp(1)%y_centroid" => 0.5, "patch_icpp(1)%length_y" => 1.0,
        "patch_icpp(1)%z_centroid" => 0.5, "patch_icpp(1)%length_z" => 1.0,
        "patch_icpp(2)%geometry" => 9,
        "patch_icpp(2)%x_centroid" => 0.45, "patch_icpp(2)%length_x" => 0.7,
        "patch_icpp(2)%y_centroid" => 0.5, "patch_icpp(2)%length_y" => 1.0,
        "patch_icpp(2)%z_centroid" => 0.5, "patch_icpp(2)%length_z" => 1.0,
        "patch_icpp(3)%geometry" => 9,
        "patch_icpp(3)%x_centroid" => 0.9, "patch_icpp(3)%length_x" => 0.2,
        "patch_icpp(3)%y_centroid" => 0.5, "patch_icpp(3)%length_y" => 1.0,
        "patch_icpp(3)%z_centroid" => 0.5, "patch_icpp(3)%length_z" => 1.0,
    }
}

/// Collects cases against a shared stack.
struct SuiteBuilder {
    stack: CompositionStack,
    cases: Vec<Case>,
}

impl SuiteBuilder {
    fn case(&mut self, label: &str, overrides: ParameterSet) {
        self.cases.push(create_case(&self.stack, label, overrides, None));
    }

    fn parallel_case(&mut self, label: &str, overrides: ParameterSet, ppn: u32) {
        let case = create_case(&self.stack, label, overrides, Some(ppn));
        self.cases.push(case);
    }

    /// Run `body` inside a scope that is popped afterwards.
    fn group(&mut self, label: &str, overrides: ParameterSet, body: impl FnOnce(&mut Self)) {
        self.stack.push(label, overrides);
        body(self);
        self.stack.pop();
    }
}

fn weno_cases(suite: &mut SuiteBuilder) {
    for order in [3, 5] {
        suite.group(
            &format!("weno_order={order}"),
            params! { "weno_order" => order },
            |suite| {
                suite.case("mapped_weno=F", params! { "mapped_weno" => "F" });
                suite.case("mapped_weno=T", params! { "mapped_weno" => "T" });
                if order == 5 {
                    suite.case("mp_weno=T", params! { "mp_weno" => "T" });
                }
            },
        );
    }
}

fn riemann_cases(suite: &mut SuiteBuilder) {
    for solver in [1, 2] {
        suite.group(
            &format!("riemann_solver={solver}"),
            params! { "riemann_solver" => solver },
            |suite| {
                suite.case("mixture_err", params! { "mixture_err" => "T" });
                suite.case("avg_state=1", params! { "avg_state" => 1 });
                suite.case("wave_speeds=2", params! { "wave_speeds" => 2 });
            },
        );
    }
}

fn two_fluid_cases(suite: &mut SuiteBuilder) {
    suite.group(
        "2 Fluids",
        params! {
            "num_fluids" => 2,
            "fluid_pp(2)%gamma" => 1.0 / (1.6 - 1.0),
            "fluid_pp(2)%pi_inf" => 0.0,
            "patch_icpp(1)%alpha_rho(1)" => 0.81, "patch_icpp(1)%alpha(1)" => 0.9,
            "patch_icpp(1)%alpha_rho(2)" => 0.19, "patch_icpp(1)%alpha(2)" => 0.1,
            "patch_icpp(2)%alpha_rho(1)" => 0.25, "patch_icpp(2)%alpha(1)" => 0.5,
            "patch_icpp(2)%alpha_rho(2)" => 0.25, "patch_icpp(2)%alpha(2)" => 0.5,
            "patch_icpp(3)%alpha_rho(1)" => 0.08, "patch_icpp(3)%alpha(1)" => 0.2,
            "patch_icpp(3)%alpha_rho(2)" => 0.0225, "patch_icpp(3)%alpha(2)" => 0.8,
        },
        |suite| {
            suite.case("model_eqns=2", params! { "model_eqns" => 2 });
            suite.case("model_eqns=3", params! { "model_eqns" => 3 });
            suite.case("mpp_lim", params! { "mpp_lim" => "T" });
            suite.case("alt_soundspeed", params! { "alt_soundspeed" => "T" });
        },
    );
}

fn bubble_cases(suite: &mut SuiteBuilder) {
    suite.group(
        "bubbles",
        params! {
            "bubbles" => "T",
            "nb" => 3,
            "fluid_pp(1)%gamma" => 0.16,
            "fluid_pp(1)%pi_inf" => 3515.0,
            "patch_icpp(1)%alpha(1)" => 0.999,
            "patch_icpp(2)%alpha(1)" => 0.999,
            "patch_icpp(3)%alpha(1)" => 0.999,
        },
        |suite| {
            suite.case("bubble_model=3", params! { "bubble_model" => 3 });
            suite.case("bubble_model=2", params! { "bubble_model" => 2, "polytropic" => "T" });
            suite.case(
                "polytropic=F",
                params! { "polytropic" => "F", "thermal" => 2 },
            );
            suite.case(
                "qbmm",
                params! { "qbmm" => "T", "polydisperse" => "T", "nb" => 1 },
            );
        },
    );
}

fn monopole_cases(suite: &mut SuiteBuilder, dimension: usize) {
    suite.group("Monopole", params! { "Monopole" => "T" }, |suite| {
        suite.case("pulse=1", params! { "Mono(1)%pulse" => 1 });
        suite.case("pulse=2", params! { "Mono(1)%pulse" => 2 });
        if dimension > 1 {
            suite.case("support=2", params! { "Mono(1)%support" => 2, "Mono(1)%loc(2)" => 0.5 });
        }
    });
}

/// Compose every regression case, in a fixed order.
pub fn generate() -> Vec<Case> {
    let mut suite = SuiteBuilder {
        stack: CompositionStack::new(),
        cases: Vec::new(),
    };

    let dimensions = [
        ("1D", one_dimensional()),
        ("2D", two_dimensional()),
        ("3D", three_dimensional()),
    ];
    for (index, (label, overrides)) in dimensions.into_iter().enumerate() {
        let dimension = index + 1;
        suite.group(label, overrides, |suite| {
            weno_cases(suite);
            riemann_cases(suite);
            two_fluid_cases(suite);
            if dimension == 1 {
                bubble_cases(suite);
            }
            if dimension < 3 {
                monopole_cases(suite, dimension);
            }
            suite.parallel_case("ppn=2", params! {}, 2);
        });
    }

    debug_assert_eq!(suite.stack.size(), 0, "suite scopes must balance");
    suite.cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::Scalar;
    use std::collections::BTreeSet;

    #[test]
    fn identities_are_unique() {
        let cases = generate();
        let ids: BTreeSet<String> = cases.iter().map(Case::identity).collect();
        assert_eq!(ids.len(), cases.len());
    }

    #[test]
    fn traces_start_with_dimension() {
        for case in generate() {
            let first = case.trace().split(" -> ").next().expect("label");
            assert!(["1D", "2D", "3D"].contains(&first), "{}", case.trace());
        }
    }

    #[test]
    fn group_overrides_reach_cases() {
        let cases = generate();
        let case = cases
            .iter()
            .find(|case| case.trace() == "1D -> bubbles -> polytropic=F")
            .expect("bubble case");
        assert_eq!(case.get("bubbles").expect("bubbles"), &Scalar::from("T"));
        assert_eq!(case.get("polytropic").expect("polytropic"), &Scalar::from("F"));
        assert_eq!(case.get("m").expect("m"), &Scalar::Int(299));
    }

    #[test]
    fn parallel_cases_request_two_ranks() {
        let parallel: Vec<_> = generate()
            .into_iter()
            .filter(|case| case.trace().ends_with("ppn=2"))
            .collect();
        assert_eq!(parallel.len(), 3);
        assert!(parallel.iter().all(|case| case.parallelism() == 2));
    }
}
