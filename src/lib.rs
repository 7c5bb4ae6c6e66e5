pub mod activation;
pub mod config;
pub mod data;
pub mod encoding;
pub mod error;
pub mod layer;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod ops;
pub mod train;
pub mod weights;

pub use activation::Activation;
pub use error::{Error, Result};
pub use layer::{Dense, Layer};
pub use network::Network;

/// Compare two 2D arrays elementwise with `approx::assert_relative_eq!`.
/// Extra `key = value` arguments are forwarded to every comparison.
#[macro_export]
macro_rules! assert_rel_eq_arr2 {
    ($actual:expr, $expected:expr $(, $opt:ident = $val:expr)* $(,)?) => {
        assert_eq!($actual.shape(), $expected.shape());
        ndarray::Zip::from(&$actual)
            .and(&$expected)
            .for_each(|v, w| {
                assert_relative_eq!(v, w $(, $opt = $val)*);
            });
    };
}
