pub mod barrier;
pub mod black_scholes;
pub mod normal;
pub mod volatility;

pub use barrier::*;
pub use black_scholes::*;
pub use normal::normal_cdf;
pub use volatility::*;
