//! # Job Transmission
//!
//! Sequences header, raster blocks, feeds and footer onto a [`Link`].
//!
//! All parameter checks happen before the first write, so a rejected job
//! leaves the printer untouched. Write failures are propagated as-is; the
//! caller owns the connection and closes it by dropping it.

use log::debug;

use super::commands::{FEED, FOOTER, HEADER};
use super::raster::RasterEncoder;
use crate::error::PhomemoError;
use crate::printer::PrinterConfig;
use crate::render::Bilevel;
use crate::transport::Link;

/// Send a bilevel image to the printer, slice by slice.
///
/// Returns the height of every slice that was sent, in order.
///
/// ## Stream Layout
///
/// ```text
/// HEADER
/// for each slice:
///     blocks...
///     FEED
///     FEED            (only if another slice follows)
/// FEED
/// FOOTER
/// ```
///
/// ## Errors
///
/// - [`PhomemoError::Protocol`] if `chunk_rows` is outside
///   `1..=config.max_chunk_rows` or the
///   image is not exactly `config.width_dots` wide. Nothing is written.
/// - [`PhomemoError::Transmission`] (or whatever the link reports) if a write fails.
///
/// ## Example
///
/// ```
/// use phomemo_layout::printer::PrinterConfig;
/// use phomemo_layout::protocol::transmit;
/// use phomemo_layout::render::Bilevel;
///
/// let image = Bilevel::from_fn(576, 3000, |_, _| false);
/// let mut sink: Vec<u8> = Vec::new();
/// let heights = transmit(&mut sink, &image, 1400, 200, &PrinterConfig::M02_PRO)?;
/// assert_eq!(heights, vec![1400, 1400, 200]);
/// # Ok::<(), phomemo_layout::PhomemoError>(())
/// ```
pub fn transmit(
    link: &mut dyn Link,
    image: &Bilevel,
    slice_height: i64,
    chunk_rows: i64,
    config: &PrinterConfig,
) -> Result<Vec<u32>, PhomemoError> {
    let encoder = RasterEncoder::new(*config, chunk_rows)?;
    encoder.check_width(image)?;

    let slices = image.slice(slice_height);
    debug!(
        "transmitting {}x{} as {} slice(s), {} rows per block",
        image.width(),
        image.height(),
        slices.len(),
        encoder.chunk_rows()
    );

    link.write_all(&HEADER)?;

    let mut heights = Vec::with_capacity(slices.len());
    for (index, slice) in slices.iter().enumerate() {
        for block in encoder.blocks(slice)? {
            link.write_all(&block.to_bytes())?;
        }
        heights.push(slice.height());

        link.write_all(&FEED)?;
        if index + 1 != slices.len() {
            link.write_all(&FEED)?;
        }
        debug!("slice {} sent ({} rows)", index, slice.height());
    }

    link.write_all(&FEED)?;
    link.write_all(&FOOTER)?;

    Ok(heights)
}
