//! QR decoding backend over `rqrr`.

use anyhow::{anyhow, Result};

use super::{Corner, DecodedSymbol, SymbolDecoder};

/// QR decoder. Stateless; every call sees one frame in isolation.
#[derive(Default)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolDecoder for QrDecoder {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn decode(&mut self, luma: &[u8], width: u32, height: u32) -> Result<Vec<DecodedSymbol>> {
        let w = width as usize;
        let h = height as usize;
        if luma.len() != w * h {
            return Err(anyhow!(
                "luma length mismatch: expected {}, got {}",
                w * h,
                luma.len()
            ));
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| luma[y * w + x]);

        let mut symbols = Vec::new();
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, text)) => {
                    let corners = grid.bounds.map(|p| Corner { x: p.x, y: p.y });
                    symbols.push(DecodedSymbol {
                        text,
                        corners: Some(corners),
                    });
                }
                Err(rqrr::DeQRError::EncodingError) => {
                    // Payload bytes are not valid UTF-8. Drop this symbol
                    // only; the rest of the frame still counts.
                    log::debug!("skipped symbol with undecodable text encoding");
                }
                Err(err) => {
                    log::debug!("undecodable symbol: {}", err);
                }
            }
        }
        Ok(symbols)
    }
}
