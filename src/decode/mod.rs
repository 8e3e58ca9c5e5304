//! Symbol decoding.
//!
//! A decoder turns one grayscale frame into zero or more decoded symbols.
//! Decoders hold no state across frames and their result order carries no
//! meaning.

use anyhow::Result;

pub mod qr;

/// One corner of a detected symbol, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub x: i32,
    pub y: i32,
}

/// One decoded symbol: the payload text plus, when the backend reports it,
/// the bounding geometry of the detected grid.
#[derive(Clone, Debug)]
pub struct DecodedSymbol {
    pub text: String,
    pub corners: Option<[Corner; 4]>,
}

/// Decoder backend trait.
///
/// `decode` receives a luma (one byte per pixel, row-major) view of the
/// frame. A symbol whose payload bytes do not form valid UTF-8 fails
/// individually and is dropped; it never aborts the remaining symbols in
/// the frame.
pub trait SymbolDecoder: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Decode all symbols found in the frame.
    fn decode(&mut self, luma: &[u8], width: u32, height: u32) -> Result<Vec<DecodedSymbol>>;
}
