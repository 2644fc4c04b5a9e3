//! Quadrature
pub mod duffy;
pub mod gauss;
pub mod types;

pub use duffy::triangle_duffy;
pub use gauss::{gauss_legendre, triangle_rule};
pub use types::{CellToCellConnectivity, QuadratureError, QuadratureRule, TestTrialQuadratureRule};
