use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Video settings for [`FfmpegEncoder::video`].
#[derive(Debug, Clone)]
pub struct VideoOptions<'a> {
    pub fps: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
    pub bitrate: Option<&'a str>,
}

/// Pipes raw RGBA frames into an ffmpeg child process.
pub struct FfmpegEncoder {
    child: Child,
    frame_len: usize,
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

fn raw_input_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ]
}

fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

impl FfmpegEncoder {
    /// Encoder for a single still image; the format follows the output extension.
    pub fn still(output_path: &Path, width: u32, height: u32) -> Result<Self> {
        let mut args = raw_input_args(width, height, 1);
        args.extend(["-frames:v".to_string(), "1".into(), path_arg(output_path)?]);
        let encoder = Self::spawn(&args, width, height)?;
        log::info!("FFmpeg image writer started: {}x{}", width, height);
        Ok(encoder)
    }

    /// Encoder for a frame sequence muxed with `input_audio`.
    pub fn video(
        output_path: &Path,
        input_audio: &Path,
        width: u32,
        height: u32,
        options: &VideoOptions<'_>,
    ) -> Result<Self> {
        let mut args = raw_input_args(width, height, options.fps);
        args.extend([
            "-i".into(), path_arg(input_audio)?,
            "-c:v".into(), options.codec.to_string(),
            "-pix_fmt".into(), options.pix_fmt.to_string(),
        ]);

        if let Some(br) = options.bitrate {
            args.extend(["-b:v".to_string(), br.to_string()]);
        } else {
            args.extend(["-crf".to_string(), options.crf.to_string()]);
            args.extend(["-preset".to_string(), "medium".to_string()]);
        }

        args.extend([
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            path_arg(output_path)?,
        ]);

        let encoder = Self::spawn(&args, width, height)?;
        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            width, height, options.fps, options.codec
        );
        Ok(encoder)
    }

    fn spawn(args: &[String], width: u32, height: u32) -> Result<Self> {
        let child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;
        Ok(Self {
            child,
            frame_len: frame_len(width, height),
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        anyhow::ensure!(
            rgba_pixels.len() == self.frame_len,
            "Frame is {} bytes, encoder expects {}",
            rgba_pixels.len(),
            self.frame_len
        );
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
