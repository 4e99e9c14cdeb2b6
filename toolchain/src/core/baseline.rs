//! Fixed baseline deck every composed case starts from.
//!
//! Three-patch 1-D shock tube, single ideal-gas fluid, fifth-order WENO with
//! HLLC fluxes. Bubble and monopole blocks are present but switched off so that
//! suite groups only need to flip a flag.

use super::params::ParameterSet;
use crate::params;

const T_STEPS: i64 = 50;
const DT: f64 = 0.0005;

pub fn baseline() -> ParameterSet {
    params! {
        "case_dir" => "'.'",
        "run_time_info" => "T",
        "m" => 0,
        "n" => 0,
        "p" => 0,
        "dt" => DT,
        "t_step_start" => 0,
        "t_step_stop" => T_STEPS,
        "t_step_save" => T_STEPS,
        "num_patches" => 3,
        "model_eqns" => 2,
        "alt_soundspeed" => "F",
        "num_fluids" => 1,
        "adv_alphan" => "T",
        "mpp_lim" => "F",
        "mixture_err" => "F",
        "time_stepper" => 3,
        "weno_vars" => 2,
        "weno_order" => 5,
        "weno_eps" => 1.0e-16,
        "mapped_weno" => "F",
        "null_weights" => "F",
        "mp_weno" => "F",
        "riemann_solver" => 2,
        "wave_speeds" => 1,
        "avg_state" => 2,
        "format" => 1,
        "precision" => 2,
        "prim_vars_wrt" => "T",
        "parallel_io" => "F",

        "patch_icpp(1)%pres" => 1.0,
        "patch_icpp(1)%alpha_rho(1)" => 1.0,
        "patch_icpp(1)%alpha(1)" => 1.0,

        "patch_icpp(2)%pres" => 0.5,
        "patch_icpp(2)%alpha_rho(1)" => 0.5,
        "patch_icpp(2)%alpha(1)" => 1.0,

        "patch_icpp(3)%pres" => 0.1,
        "patch_icpp(3)%alpha_rho(1)" => 0.125,
        "patch_icpp(3)%alpha(1)" => 1.0,

        "fluid_pp(1)%gamma" => 1.0 / (1.4 - 1.0),
        "fluid_pp(1)%pi_inf" => 0.0,

        "bubbles" => "F",
        "Ca" => 0.9769178386380458,
        "Web" => 13.927835051546392,
        "Re_inv" => 0.009954269975623245,
        "pref" => 101325.0,
        "rhoref" => 1000.0,
        "bubble_model" => 3,
        "polytropic" => "T",
        "polydisperse" => "F",
        "thermal" => 3,
        "R0ref" => 1e-05,
        "patch_icpp(1)%r0" => 1,
        "patch_icpp(1)%v0" => 0,
        "patch_icpp(2)%r0" => 1,
        "patch_icpp(2)%v0" => 0,
        "patch_icpp(3)%r0" => 1,
        "patch_icpp(3)%v0" => 0,

        "qbmm" => "F",
        "dist_type" => 2,
        "poly_sigma" => 0.3,
        "R0_type" => 1,
        "sigR" => 0.1,
        "sigV" => 0.1,
        "rhoRV" => 0.0,

        "Monopole" => "F",
        "num_mono" => 1,
        "Mono(1)%loc(1)" => 0.5,
        "Mono(1)%mag" => 1.0,
        "Mono(1)%length" => 0.25,
        "Mono(1)%dir" => 1.0,
        "Mono(1)%npulse" => 1,
        "Mono(1)%pulse" => 1,
        "cu_mpi" => "F",
    }
}
