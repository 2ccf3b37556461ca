//! File sample provider using symphonia
//!
//! Decodes MP3, FLAC, AAC, Vorbis and WAV files to interleaved `f32` frames.
//!
//! Positioning uses decode-and-skip: a read at the next sequential frame
//! continues the running decoder, a read further ahead decodes and discards up
//! to the target, and a read behind the current position reopens the file and
//! skips from the start. Compressed seeking is never used, so positions are
//! sample accurate for every format.

use super::provider::{ProviderError, SampleProvider};
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Sample provider backed by an audio file
pub struct SymphoniaProvider {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: usize,
    sample_rate: u32,
    length_frames: Option<u64>,

    /// File frame of the first undelivered sample in `pending`
    next_frame: u64,

    /// Decoded samples not yet handed out
    pending: Vec<f32>,
    pending_pos: usize,

    sample_buf: Option<SampleBuffer<f32>>,

    /// Decoder reached the end of the file
    finished: bool,
}

impl SymphoniaProvider {
    /// Open and probe an audio file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening audio file: {}", path.display());

        let (format, decoder, track_id) = Self::open_stream(&path)?;

        let params = format
            .tracks()
            .iter()
            .find(|t| t.id == track_id)
            .map(|t| t.codec_params.clone())
            .ok_or_else(|| ProviderError::Decode {
                offset: 0,
                message: "No audio track found".to_string(),
            })?;

        let sample_rate = params.sample_rate.ok_or_else(|| ProviderError::Decode {
            offset: 0,
            message: "Sample rate not found".to_string(),
        })?;

        let channels = params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| ProviderError::Decode {
                offset: 0,
                message: "Channel count not found".to_string(),
            })?;

        debug!(
            "Audio format: sample_rate={}, channels={}, frames={:?}",
            sample_rate, channels, params.n_frames
        );

        Ok(Self {
            path,
            format,
            decoder,
            track_id,
            channels,
            sample_rate,
            length_frames: params.n_frames,
            next_frame: 0,
            pending: Vec::new(),
            pending_pos: 0,
            sample_buf: None,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_stream(path: &Path) -> Result<(Box<dyn FormatReader>, Box<dyn Decoder>, u32), ProviderError> {
        let file = std::fs::File::open(path).map_err(|e| ProviderError::Io {
            offset: 0,
            message: format!("Failed to open file {}: {}", path.display(), e),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProviderError::Decode {
                offset: 0,
                message: format!("Failed to probe format: {}", e),
            })?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProviderError::Decode {
                offset: 0,
                message: "No audio track found".to_string(),
            })?;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ProviderError::Decode {
                offset: 0,
                message: format!("Failed to create decoder: {}", e),
            })?;

        let track_id = track.id;
        Ok((format, decoder, track_id))
    }

    /// Restart decoding from the first frame
    fn rewind(&mut self) -> Result<(), ProviderError> {
        debug!("Rewinding {} for backward read", self.path.display());
        let (format, decoder, track_id) = Self::open_stream(&self.path)?;
        self.format = format;
        self.decoder = decoder;
        self.track_id = track_id;
        self.next_frame = 0;
        self.pending.clear();
        self.pending_pos = 0;
        self.finished = false;
        Ok(())
    }

    fn pending_frames(&self) -> usize {
        (self.pending.len() - self.pending_pos) / self.channels
    }

    /// Decode the next packet into `pending`; false at end of file
    fn decode_next(&mut self) -> Result<bool, ProviderError> {
        if self.finished {
            return Ok(false);
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file at frame {}", self.next_frame);
                    self.finished = true;
                    if self.length_frames.is_none() {
                        self.length_frames = Some(self.next_frame + self.pending_frames() as u64);
                    }
                    return Ok(false);
                }
                Err(SymphoniaError::IoError(e)) => {
                    return Err(ProviderError::Io {
                        offset: self.next_frame,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(ProviderError::Decode {
                        offset: self.next_frame,
                        message: format!("Error reading packet: {}", e),
                    });
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = self
                .decoder
                .decode(&packet)
                .map_err(|e| ProviderError::Decode {
                    offset: self.next_frame,
                    message: e.to_string(),
                })?;

            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let needed = decoded.capacity() * spec.channels.count();
            if self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < needed)
            {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            self.pending.clear();
            self.pending_pos = 0;
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }
            return Ok(true);
        }
    }

    /// Decode and discard until `target` is the next frame
    fn skip_to(&mut self, target: u64) -> Result<(), ProviderError> {
        if target < self.next_frame {
            self.rewind()?;
        }

        while self.next_frame < target {
            let available = self.pending_frames();
            if available == 0 {
                if !self.decode_next()? {
                    return Err(ProviderError::Eof { offset: target });
                }
                continue;
            }
            let skip = available.min((target - self.next_frame) as usize);
            self.pending_pos += skip * self.channels;
            self.next_frame += skip as u64;
        }
        Ok(())
    }
}

impl SampleProvider for SymphoniaProvider {
    fn channels(&self) -> usize {
        self.channels
    }

    fn length_frames(&self) -> Option<u64> {
        self.length_frames
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }

    fn read(&mut self, offset: u64, out: &mut [f32]) -> Result<usize, ProviderError> {
        if let Some(length) = self.length_frames {
            if offset >= length {
                return Err(ProviderError::Eof { offset });
            }
        }

        if offset != self.next_frame {
            self.skip_to(offset)?;
        }

        let wanted = out.len() / self.channels;
        let mut written = 0;

        while written < wanted {
            let available = self.pending_frames();
            if available == 0 {
                if !self.decode_next()? {
                    break;
                }
                continue;
            }

            let frames = available.min(wanted - written);
            let len = frames * self.channels;
            let dst = written * self.channels;
            out[dst..dst + len]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + len]);
            self.pending_pos += len;
            self.next_frame += frames as u64;
            written += frames;
        }

        if written == 0 {
            return Err(ProviderError::Eof { offset });
        }
        Ok(written)
    }
}
