use thiserror::Error;

/// Failures raised by the renderer and the texture cache.
///
/// `ResourceAllocation` is fatal for the current renderer: the frame queue
/// has been discarded and the vertex buffer is left at its previous size.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {requested} byte vertex buffer (device limit is {limit} bytes)")]
    ResourceAllocation { requested: u64, limit: u64 },

    #[error("failed to read texture '{name}'")]
    TextureIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture '{name}'")]
    TextureDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid texture size {width}x{height}")]
    InvalidTextureSize { width: u32, height: u32 },
}
