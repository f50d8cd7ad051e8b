//! Ken Burns pan/zoom parametrization.
//!
//! The same interpolation is expressed twice: as plain functions of time
//! (`zoom_at`, `pan_at`) and as an FFmpeg `zoompan` expression evaluated per
//! output frame. Both use `start * (1 - e) + end * e` so the endpoints are
//! reproduced exactly.

use vforge_models::{Easing, KenBurnsParams};

/// Minimum pre-scale headroom relative to the largest zoom.
pub const HEADROOM_FACTOR: f64 = 1.5;

/// Largest zoom honoured; larger requests are clamped.
pub const MAX_ZOOM: f64 = 10.0;

/// Eased progress for normalized time `p` in `[0, 1]`.
pub fn ease(easing: Easing, p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => p,
        Easing::EaseIn => p * p,
        Easing::EaseOut => 1.0 - (1.0 - p) * (1.0 - p),
        Easing::EaseInOut => (1.0 - (std::f64::consts::PI * p).cos()) / 2.0,
    }
}

fn lerp(start: f64, end: f64, e: f64) -> f64 {
    start * (1.0 - e) + end * e
}

/// Sanitized Ken Burns motion for one clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KenBurnsMotion {
    pub start_zoom: f64,
    pub end_zoom: f64,
    pub start_pan: (f64, f64),
    pub end_pan: (f64, f64),
    pub easing: Easing,
}

impl KenBurnsMotion {
    /// Resolve defaults and clamp into the renderable range.
    ///
    /// Zoom below 1 cannot be rendered by `zoompan` and is raised to 1;
    /// pan is clamped to `[-1, 1]`. Non-finite values take their defaults.
    pub fn from_params(params: &KenBurnsParams) -> Self {
        let defaults = KenBurnsParams::default();
        let zoom = |v: f64, d: f64| {
            if v.is_finite() {
                v.clamp(1.0, MAX_ZOOM)
            } else {
                d
            }
        };
        let pan = |v: f64| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        let (sx, sy) = params.start_pan();
        let (ex, ey) = params.end_pan();

        Self {
            start_zoom: zoom(params.start_zoom(), defaults.start_zoom()),
            end_zoom: zoom(params.end_zoom(), defaults.end_zoom()),
            start_pan: (pan(sx), pan(sy)),
            end_pan: (pan(ex), pan(ey)),
            easing: params.easing,
        }
    }

    pub fn max_zoom(&self) -> f64 {
        self.start_zoom.max(self.end_zoom)
    }

    /// Zoom factor at time `t` of a clip lasting `duration` seconds.
    pub fn zoom_at(&self, t: f64, duration: f64) -> f64 {
        lerp(self.start_zoom, self.end_zoom, self.eased(t, duration))
    }

    /// Normalized pan `(x, y)` at time `t`, each in `[-1, 1]`.
    pub fn pan_at(&self, t: f64, duration: f64) -> (f64, f64) {
        let e = self.eased(t, duration);
        (
            lerp(self.start_pan.0, self.end_pan.0, e),
            lerp(self.start_pan.1, self.end_pan.1, e),
        )
    }

    /// Pan offset in pixels at time `t` for a `width`×`height` frame.
    pub fn pan_offset_at(&self, t: f64, duration: f64, width: u32, height: u32) -> (f64, f64) {
        let (x, y) = self.pan_at(t, duration);
        (x * width as f64 / 2.0, y * height as f64 / 2.0)
    }

    fn eased(&self, t: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 1.0;
        }
        ease(self.easing, t / duration)
    }
}

/// Output frames for a clip: `ceil(duration * fps)`, at least one.
pub fn frame_count(duration: f64, fps: u32) -> u32 {
    let frames = (duration.max(0.0) * fps as f64).ceil();
    (frames as u32).max(1)
}

/// Dimensions the still is scaled to before `zoompan`.
///
/// At least `1.5 * max_zoom` times the output in both axes, rounded up to
/// even values.
pub fn prescale_dimensions(width: u32, height: u32, max_zoom: f64) -> (u32, u32) {
    let factor = HEADROOM_FACTOR * max_zoom.max(1.0);
    let scale = |v: u32| {
        let scaled = (v as f64 * factor).ceil() as u32;
        scaled + scaled % 2
    };
    (scale(width), scale(height))
}

/// Top-left of the zoom window along one axis of a pre-scaled `extent`.
///
/// Pan `-1` puts the window on the near edge, `1` on the far edge and `0`
/// centres it. This is the formula `zoompan_filter` emits for `x` and `y`.
pub fn window_origin(extent: f64, zoom: f64, pan: f64) -> f64 {
    let travel = extent - extent / zoom.max(1.0);
    travel / 2.0 * (1.0 + pan.clamp(-1.0, 1.0))
}

fn easing_expr(easing: Easing, p: &str) -> String {
    match easing {
        Easing::Linear => p.to_string(),
        Easing::EaseIn => format!("({p})*({p})"),
        Easing::EaseOut => format!("(1-(1-({p}))*(1-({p})))"),
        Easing::EaseInOut => format!("((1-cos(PI*({p})))/2)"),
    }
}

fn lerp_expr(start: f64, end: f64, e: &str) -> String {
    format!("({start:.6}*(1-{e})+{end:.6}*{e})")
}

/// Build the filter chain for a still image: pre-scale, crop, `zoompan`.
///
/// The input is expected to be a looped still at `fps`; `zoompan` runs with
/// `d=1` so each input frame yields one output frame and `on` counts frames.
pub fn zoompan_filter(motion: &KenBurnsMotion, duration: f64, width: u32, height: u32, fps: u32) -> String {
    let frames = frame_count(duration, fps);
    let (pw, ph) = prescale_dimensions(width, height, motion.max_zoom());

    let progress = format!("min(on/{},1)", frames.saturating_sub(1).max(1));
    let e = easing_expr(motion.easing, &progress);
    let zoom = lerp_expr(motion.start_zoom, motion.end_zoom, &e);
    let pan_x = lerp_expr(motion.start_pan.0, motion.end_pan.0, &e);
    let pan_y = lerp_expr(motion.start_pan.1, motion.end_pan.1, &e);

    // Pan spans the window's full travel inside the pre-scaled image.
    let x = format!("(iw-iw/zoom)/2*(1+{pan_x})");
    let y = format!("(ih-ih/zoom)/2*(1+{pan_y})");

    format!(
        "scale={pw}:{ph}:force_original_aspect_ratio=increase,crop={pw}:{ph},\
         zoompan=z='{zoom}':x='{x}':y='{y}':d=1:s={width}x{height}:fps={fps}"
    )
}
