pub mod fetch;
pub mod inspect;
pub mod process;
pub mod refeature;
pub mod synth;
pub mod util;
