use serde::{Deserialize, Serialize};

/// Interpolation mode for an animation track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Linear,
    Step,
    Bezier,
    CatmullRom,
    Slerp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Easing {
    Bezier {
        cx1: f64,
        cy1: f64,
        cx2: f64,
        cy2: f64,
    },
}

/// Value carried by a keyframe: a plain scalar, or a scalar-plus-color pair
/// (mirrors `ParamValue` so a track can animate either shape of parameter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackValue {
    Scalar(f64),
    Colored { value: f64, color: [f32; 4] },
}

impl TrackValue {
    pub fn scalar(&self) -> f64 {
        match self {
            TrackValue::Scalar(v) => *v,
            TrackValue::Colored { value, .. } => *value,
        }
    }

    pub fn color(&self) -> Option<[f32; 4]> {
        match self {
            TrackValue::Scalar(_) => None,
            TrackValue::Colored { color, .. } => Some(*color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub time_sec: f64,
    pub value: TrackValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub interpolation: Interpolation,
    /// Sorted ascending by `time_sec`; `push_keyframe` maintains the order.
    pub keyframes: Vec<Keyframe>,
}

impl Track {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            keyframes: Vec::new(),
        }
    }

    pub fn push_keyframe(&mut self, kf: Keyframe) {
        let idx = self
            .keyframes
            .partition_point(|k| k.time_sec < kf.time_sec);
        self.keyframes.insert(idx, kf);
    }

    /// Deterministic, pure sample at time `t`, falling back to `default` when
    /// the track is absent or empty.
    pub fn sample(&self, t: f64, default: TrackValue) -> TrackValue {
        sample_track(Some(self), t, default)
    }
}

/// Samples a track at time `t`. A `None` track or an empty one always yields
/// `default`.
pub fn sample_track(track: Option<&Track>, t: f64, default: TrackValue) -> TrackValue {
    let Some(track) = track else {
        return default;
    };
    if track.keyframes.is_empty() {
        return default;
    }
    if track.keyframes.len() == 1 {
        return track.keyframes[0].value;
    }
    if t <= track.keyframes[0].time_sec {
        return track.keyframes[0].value;
    }
    let last = track.keyframes.len() - 1;
    if t >= track.keyframes[last].time_sec {
        return track.keyframes[last].value;
    }
    let idx = track
        .keyframes
        .partition_point(|k| k.time_sec <= t)
        .saturating_sub(1);
    let a = &track.keyframes[idx];
    let b = &track.keyframes[idx + 1];
    let span = b.time_sec - a.time_sec;
    let local = if span <= f64::EPSILON {
        0.0
    } else {
        (t - a.time_sec) / span
    };
    interpolate(track.interpolation, a, b, local)
}

fn interpolate(mode: Interpolation, a: &Keyframe, b: &Keyframe, local: f64) -> TrackValue {
    match mode {
        Interpolation::Step => a.value,
        Interpolation::Linear => lerp_value(a.value, b.value, local),
        Interpolation::Bezier => {
            let eased = match b.easing {
                Some(Easing::Bezier { cx1, cy1, cx2, cy2 }) => {
                    cubic_bezier_ease(cx1, cy1, cx2, cy2, local)
                }
                None => local,
            };
            lerp_value(a.value, b.value, eased)
        }
        Interpolation::CatmullRom => lerp_value(a.value, b.value, smoothstep(local)),
        Interpolation::Slerp => slerp_value(a.value, b.value, local),
    }
}

fn lerp_value(a: TrackValue, b: TrackValue, t: f64) -> TrackValue {
    let value = a.scalar() + (b.scalar() - a.scalar()) * t;
    match (a.color(), b.color()) {
        (Some(ca), Some(cb)) => TrackValue::Colored {
            value,
            color: lerp_color(ca, cb, t as f32),
        },
        _ => TrackValue::Scalar(value),
    }
}

fn slerp_value(a: TrackValue, b: TrackValue, t: f64) -> TrackValue {
    match (a.color(), b.color()) {
        (Some(ca), Some(cb)) => TrackValue::Colored {
            value: a.scalar() + (b.scalar() - a.scalar()) * t,
            color: slerp_color(ca, cb, t as f32),
        },
        _ => lerp_value(a, b, t),
    }
}

fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = a[i] + (b[i] - a[i]) * t;
    }
    out
}

/// Spherical interpolation over the hue angle encoded in channel 0,
/// linear elsewhere; a simplified slerp suitable for hue-wheel style color
/// tracks without pulling in a quaternion dependency.
fn slerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let two_pi = std::f32::consts::TAU;
    let mut delta = (b[0] - a[0]) % two_pi;
    if delta > std::f32::consts::PI {
        delta -= two_pi;
    } else if delta < -std::f32::consts::PI {
        delta += two_pi;
    }
    let hue = (a[0] + delta * t).rem_euclid(two_pi);
    let rest = lerp_color(a, b, t);
    [hue, rest[1], rest[2], rest[3]]
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn cubic_bezier_ease(_cx1: f64, cy1: f64, _cx2: f64, cy2: f64, t: f64) -> f64 {
    // Approximates the bezier easing curve's y-at-x via a coarse Bezier
    // evaluation of the control polygon's y component over uniform t; exact
    // inversion of x(t) is unnecessary precision for a non-destructive
    // preview sampler.
    let mt = 1.0 - t;
    3.0 * mt * mt * t * cy1 + 3.0 * mt * t * t * cy2 + t * t * t
}
