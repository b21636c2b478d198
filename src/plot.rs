//! Raster plot hook.
//!
//! The crate does not render maps itself. Applications that want one implement
//! [`RasterPlotter`] with their drawing backend of choice and hand it to
//! [`CellResult::plot_with`], which resolves the palette from the catalog.

use crate::catalog::{Catalog, Palette};
use crate::error::{Error, Result};
use crate::models::CellResult;

/// Palette used when the caller does not name one.
pub const DEFAULT_PALETTE: &str = "YlOrRd";

/// Renders a query result with a colour ramp.
pub trait RasterPlotter {
    type Output;

    fn plot(&self, result: &CellResult, palette: &Palette) -> Result<Self::Output>;
}

impl CellResult {
    /// Plot through `plotter` with the named palette (or [`DEFAULT_PALETTE`]).
    pub fn plot_with<P: RasterPlotter>(
        &self,
        plotter: &P,
        catalog: &Catalog,
        palette: Option<&str>,
    ) -> Result<P::Output> {
        let name = palette.unwrap_or(DEFAULT_PALETTE);
        let palette = catalog
            .palette(name)
            .ok_or_else(|| Error::invalid(format!("unknown palette {name:?}")))?;
        plotter.plot(self, palette)
    }
}
