use std::path::{Path, PathBuf};

use ffmpeg_next::codec::encoder::video::Encoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;
use crate::video::domain::video_writer::VideoWriter;

const FALLBACK_FPS: i32 = 30;
const VIDEO_STREAM_INDEX: usize = 0;

/// Encodes RGB frames to MPEG-4 via ffmpeg-next.
///
/// With audio passthrough enabled (the default), the source's audio stream
/// is remuxed into the finished output on close.
pub struct FfmpegWriter {
    keep_audio: bool,
    session: Option<EncodeSession>,
}

struct EncodeSession {
    octx: Output,
    encoder: Encoder,
    scaler: scaling::Context,
    output_path: PathBuf,
    source_path: Option<PathBuf>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            keep_audio: true,
            session: None,
        }
    }

    pub fn with_audio(mut self, keep_audio: bool) -> Self {
        self.keep_audio = keep_audio;
        self
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), BoxError> {
        ffmpeg_next::init()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = match metadata.fps.round() as i32 {
            f if f > 0 => f,
            _ => FALLBACK_FPS,
        };
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        self.session = Some(EncodeSession {
            octx,
            encoder,
            scaler,
            output_path: path.to_path_buf(),
            source_path: metadata.source_path.clone(),
            width: metadata.width,
            height: metadata.height,
            fps,
            frame_count: 0,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let session = self.session.as_mut().ok_or("FfmpegWriter: not opened")?;
        if frame.width() != session.width
            || frame.height() != session.height
            || frame.channels() != 3
        {
            return Err(format!(
                "frame {} is {}x{}x{}, encoder expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                session.width,
                session.height
            )
            .into());
        }

        let mut rgb_frame = Video::new(Pixel::RGB24, session.width, session.height);
        let stride = rgb_frame.stride(0);
        let row_len = session.width as usize * 3;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_len).enumerate() {
            dst[row * stride..row * stride + row_len].copy_from_slice(src_row);
        }

        let mut yuv_frame = Video::empty();
        session.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(session.frame_count as i64));

        session.encoder.send_frame(&yuv_frame)?;
        session.drain_packets()?;
        session.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        session.encoder.send_eof()?;
        session.drain_packets()?;
        session.octx.write_trailer()?;
        log::debug!(
            "Encoded {} frames to {}",
            session.frame_count,
            session.output_path.display()
        );

        let EncodeSession {
            octx,
            output_path,
            source_path,
            ..
        } = session;
        drop(octx);

        if let (true, Some(source)) = (self.keep_audio, source_path) {
            if let Err(e) = mux_audio(&source, &output_path) {
                log::warn!("Audio muxing failed: {e}");
            }
        }
        Ok(())
    }
}

impl EncodeSession {
    fn drain_packets(&mut self) -> Result<(), BoxError> {
        let ost_time_base = self
            .octx
            .stream(VIDEO_STREAM_INDEX)
            .ok_or("output video stream missing")?
            .time_base();
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(VIDEO_STREAM_INDEX);
            encoded.rescale_ts(Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

/// Copies audio from `source` into `video_output` by remuxing through a
/// temp file that then replaces the output. No-op when the source has no
/// audio stream.
fn mux_audio(source: &Path, video_output: &Path) -> Result<(), BoxError> {
    let mut ictx_source = ffmpeg_next::format::input(source)?;
    if ictx_source
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .is_none()
    {
        return Ok(());
    }
    let mut ictx_video = ffmpeg_next::format::input(video_output)?;

    let ext = video_output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    let temp_path = video_output.with_extension(format!("mux.{ext}"));
    let mut octx = ffmpeg_next::format::output(&temp_path)?;

    let video_map = map_streams(&ictx_video, &mut octx, ffmpeg_next::media::Type::Video, 0)?;
    let first_audio = video_map.iter().flatten().count();
    let audio_map = map_streams(
        &ictx_source,
        &mut octx,
        ffmpeg_next::media::Type::Audio,
        first_audio,
    )?;

    octx.write_header()?;
    copy_packets(&mut ictx_video, &mut octx, &video_map)?;
    copy_packets(&mut ictx_source, &mut octx, &audio_map)?;
    octx.write_trailer()?;
    drop(octx);

    std::fs::rename(&temp_path, video_output)?;
    Ok(())
}

/// Adds one output stream per input stream of `medium`; returns the output
/// index for each input stream.
fn map_streams(
    ictx: &ffmpeg_next::format::context::Input,
    octx: &mut Output,
    medium: ffmpeg_next::media::Type,
    mut next_index: usize,
) -> Result<Vec<Option<usize>>, BoxError> {
    let mut map = vec![None; ictx.nb_streams() as usize];
    for (idx, stream) in ictx.streams().enumerate() {
        if stream.parameters().medium() != medium {
            continue;
        }
        let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
        ost.set_parameters(stream.parameters());
        // Let the muxer pick a tag valid for the output container.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        map[idx] = Some(next_index);
        next_index += 1;
    }
    Ok(map)
}

fn copy_packets(
    ictx: &mut ffmpeg_next::format::context::Input,
    octx: &mut Output,
    map: &[Option<usize>],
) -> Result<(), BoxError> {
    let time_bases: Vec<_> = ictx.streams().map(|s| s.time_base()).collect();
    for (stream, mut packet) in ictx.packets() {
        let ist = stream.index();
        let Some(ost) = map.get(ist).copied().flatten() else {
            continue;
        };
        let ost_time_base = octx.stream(ost).ok_or("output stream missing")?.time_base();
        packet.rescale_ts(time_bases[ist], ost_time_base);
        packet.set_position(-1);
        packet.set_stream(ost);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}
