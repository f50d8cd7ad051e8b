//! FFmpeg filter graph construction.
//!
//! Every segment leaves its chain at the same resolution, frame rate, pixel
//! format and sample aspect ratio so the concat step can join them safely.

/// Pixel format shared by every intermediate segment.
pub const SEGMENT_PIXEL_FORMAT: &str = "yuv420p";

/// Scale to fit, pad to the exact frame, and resample to `fps`.
pub fn normalize_filter(width: u32, height: u32, fps: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,fps={fps}",
        w = width,
        h = height,
        fps = fps
    )
}

/// Final pixel format and square pixels.
pub fn finalize_filter() -> String {
    format!("format={},setsar=1", SEGMENT_PIXEL_FORMAT)
}

/// Hold the last frame so a source shorter than the clip still fills it.
pub fn hold_last_frame_filter(duration: f64) -> String {
    format!("tpad=stop_mode=clone:stop_duration={:.3}", duration)
}

/// Brightness fade at the start of the clip's local time axis.
pub fn fade_in_filter(fade: f64) -> String {
    format!("fade=t=in:st=0:d={:.3}", fade)
}

/// Brightness fade ending at the clip's last frame.
pub fn fade_out_filter(clip_duration: f64, fade: f64) -> String {
    let start = (clip_duration - fade).max(0.0);
    format!("fade=t=out:st={:.3}:d={:.3}", start, fade)
}

/// Join filters into a single chain, skipping empty ones.
pub fn chain<I, S>(filters: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    filters
        .into_iter()
        .filter(|f| !f.as_ref().is_empty())
        .map(|f| f.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Delay for one audio input, in whole milliseconds.
pub fn delay_ms(start_time: f64) -> u64 {
    (start_time.max(0.0) * 1000.0).round() as u64
}

/// Filter graph that delays each audio input by its offset and mixes them.
///
/// Input `i` is delayed by `delays_ms[i]`. Mixing uses `duration=longest` so
/// shorter inputs are padded with silence rather than truncating the mix,
/// and `normalize=0` so non-overlapping narration keeps its level.
/// The result is labelled `[aout]`.
pub fn audio_mix_filter(delays_ms: &[u64]) -> String {
    let mut graph: Vec<String> = delays_ms
        .iter()
        .enumerate()
        .map(|(i, ms)| format!("[{i}:a]adelay={ms}:all=1[a{i}]"))
        .collect();

    match delays_ms.len() {
        0 => String::new(),
        1 => {
            graph[0] = format!("[0:a]adelay={}:all=1[aout]", delays_ms[0]);
            graph.join(";")
        }
        n => {
            let labels: String = (0..n).map(|i| format!("[a{i}]")).collect();
            graph.push(format!(
                "{labels}amix=inputs={n}:duration=longest:dropout_transition=0:normalize=0[aout]"
            ));
            graph.join(";")
        }
    }
}

/// Escape a path for a concat demuxer `file '…'` line.
pub fn concat_list_entry(path: &str) -> String {
    format!("file '{}'", path.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chain() {
        let f = chain([normalize_filter(1280, 720, 25), finalize_filter()]);
        assert_eq!(
            f,
            "scale=1280:720:force_original_aspect_ratio=decrease,\
             pad=1280:720:(ow-iw)/2:(oh-ih)/2:color=black,fps=25,format=yuv420p,setsar=1"
        );
    }

    #[test]
    fn test_fades_use_local_time() {
        assert_eq!(fade_in_filter(0.5), "fade=t=in:st=0:d=0.500");
        assert_eq!(fade_out_filter(4.0, 0.5), "fade=t=out:st=3.500:d=0.500");
        assert_eq!(fade_out_filter(0.3, 0.5), "fade=t=out:st=0.000:d=0.500");
    }

    #[test]
    fn test_chain_skips_empty() {
        assert_eq!(chain(["a", "", "b"]), "a,b");
    }

    #[test]
    fn test_delay_ms() {
        assert_eq!(delay_ms(0.0), 0);
        assert_eq!(delay_ms(5.5), 5500);
        assert_eq!(delay_ms(1.0004), 1000);
        assert_eq!(delay_ms(-1.0), 0);
    }

    #[test]
    fn test_audio_mix_single_input() {
        assert_eq!(audio_mix_filter(&[0]), "[0:a]adelay=0:all=1[aout]");
    }

    #[test]
    fn test_audio_mix_many_inputs() {
        let graph = audio_mix_filter(&[0, 5500, 11500]);
        assert_eq!(
            graph,
            "[0:a]adelay=0:all=1[a0];[1:a]adelay=5500:all=1[a1];[2:a]adelay=11500:all=1[a2];\
             [a0][a1][a2]amix=inputs=3:duration=longest:dropout_transition=0:normalize=0[aout]"
        );
    }

    #[test]
    fn test_concat_entry_escapes_quotes() {
        assert_eq!(concat_list_entry("/tmp/a.mp4"), "file '/tmp/a.mp4'");
        assert_eq!(concat_list_entry("/tmp/it's.mp4"), "file '/tmp/it'\\''s.mp4'");
    }
}
