pub mod error;
pub mod codec;
pub mod crypto;
pub mod chunk;
pub mod wave;
pub mod transform;
pub mod reader;
pub mod writer;
pub mod best_fit;
pub mod wavefile;

pub use error::{Result, WaveError};
pub use codec::{get_codec, CompressionKind, PcmLayout, SELECTABLE_COMPRESSIONS};
pub use crypto::{CipherKey, EncryptionKind};
pub use chunk::ExtraChunk;
pub use wave::{Wave, WaveFormat, WaveInfo};
pub use transform::TransformOptions;
pub use reader::read_wave;
pub use writer::{write_plain, write_wave};
pub use best_fit::{select_best, select_best_for, BestFit};
pub use wavefile::{CompressionChoice, PackOptions, PackOutcome, WaveFile};
