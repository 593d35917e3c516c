mod extractor;

pub use extractor::{FrameExtractor, JpegFrameExtractor};
