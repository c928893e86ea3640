//! Turns the agent's duck-typed status object into canonical hand poses.
//!
//! The tracking service has gone through several wire shapes; rather than
//! version the payloads we probe an ordered list of alternate field names
//! (flat and nested) and take the first present, non-null value. Missing or
//! malformed fields are never errors here: a hand that cannot produce both
//! coordinates simply yields no pose.

use serde_json::Value;

/// One normalized hand pose, coordinates in [0,1] x [0,1].
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    pub x: f32,
    pub y: f32,
    pub tracking: bool,
    pub gesture: String,
}

/// Up to two named hands plus the legacy single-pointer fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedHands {
    pub left: Option<HandPose>,
    pub right: Option<HandPose>,
    pub single: Option<HandPose>,
}

/// Best-effort frame dimensions used to scale pixel coordinates when the
/// payload does not declare its own width/height.
#[derive(Debug, Clone, Copy)]
pub struct FrameDims {
    pub width: f32,
    pub height: f32,
}

impl Default for FrameDims {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

const LEFT_X: &[&str] = &[
    "leftPointerX",
    "pointerLeftX",
    "handLeftX",
    "leftX",
    "left.x",
    "handLeft.x",
];
const LEFT_Y: &[&str] = &[
    "leftPointerY",
    "pointerLeftY",
    "handLeftY",
    "leftY",
    "left.y",
    "handLeft.y",
];
const LEFT_TRACKING: &[&str] = &[
    "leftTracking",
    "isLeftTracking",
    "leftHandTracking",
    "leftHandPresent",
    "left.tracking",
    "handLeft.tracking",
];
const LEFT_GESTURE: &[&str] = &["leftGesture", "left.gesture", "handLeft.gesture"];

const RIGHT_X: &[&str] = &[
    "rightPointerX",
    "pointerRightX",
    "handRightX",
    "rightX",
    "right.x",
    "handRight.x",
];
const RIGHT_Y: &[&str] = &[
    "rightPointerY",
    "pointerRightY",
    "handRightY",
    "rightY",
    "right.y",
    "handRight.y",
];
const RIGHT_TRACKING: &[&str] = &[
    "rightTracking",
    "isRightTracking",
    "rightHandTracking",
    "rightHandPresent",
    "right.tracking",
    "handRight.tracking",
];
const RIGHT_GESTURE: &[&str] = &["rightGesture", "right.gesture", "handRight.gesture"];

const SINGLE_X: &[&str] = &["pointerX", "cursorX", "x", "pointer.x", "cursor.x"];
const SINGLE_Y: &[&str] = &["pointerY", "cursorY", "y", "pointer.y", "cursor.y"];
const SINGLE_TRACKING: &[&str] = &["isTracking", "tracking", "handTracking", "handPresent"];
const SINGLE_GESTURE: &[&str] = &["gesture"];

const FRAME_W: &[&str] = &["frameWidth", "imageWidth", "width"];
const FRAME_H: &[&str] = &["frameHeight", "imageHeight", "height"];

/// Resolve a (possibly dotted) key path to its value, if present and non-null.
fn lookup<'a>(status: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        let mut cur = status;
        let mut found = true;
        for part in key.split('.') {
            match cur.get(part) {
                Some(v) => cur = v,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found && !cur.is_null() {
            return Some(cur);
        }
    }
    None
}

fn lookup_f64(status: &Value, keys: &[&str]) -> Option<f64> {
    let v = lookup(status, keys)?;
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lookup_bool(status: &Value, keys: &[&str]) -> Option<bool> {
    let v = lookup(status, keys)?;
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lookup_gesture(status: &Value, keys: &[&str]) -> String {
    lookup(status, keys)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
        .unwrap_or_default()
}

/// Scale-detect one coordinate into [0,1].
///
/// - already in [0,1]: used as-is,
/// - roughly [-1.1, 1.1]: treated as NDC and remapped via (v+1)/2,
/// - anything else finite: treated as a pixel coordinate against `dim`.
fn normalize_coord(v: f64, dim: f32) -> Option<f32> {
    if !v.is_finite() {
        return None;
    }
    if (0.0..=1.0).contains(&v) {
        return Some(v as f32);
    }
    if (-1.1..=1.1).contains(&v) {
        return Some((((v + 1.0) / 2.0) as f32).clamp(0.0, 1.0));
    }
    let dim = if dim > 0.0 { dim } else { 1.0 };
    Some((v as f32 / dim).clamp(0.0, 1.0))
}

fn frame_dims(status: &Value, fallback: FrameDims) -> FrameDims {
    let width = lookup_f64(status, FRAME_W)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map_or(fallback.width, |v| v as f32);
    let height = lookup_f64(status, FRAME_H)
        .filter(|v| v.is_finite() && *v > 0.0)
        .map_or(fallback.height, |v| v as f32);
    FrameDims { width, height }
}

fn read_hand(
    status: &Value,
    x_keys: &[&str],
    y_keys: &[&str],
    tracking_keys: &[&str],
    gesture_keys: &[&str],
    dims: FrameDims,
    enabled: bool,
) -> Option<HandPose> {
    // Coordinate presence is all-or-nothing: a half-valid pose is no pose.
    let x = normalize_coord(lookup_f64(status, x_keys)?, dims.width)?;
    let y = normalize_coord(lookup_f64(status, y_keys)?, dims.height)?;

    let tracking = lookup_bool(status, tracking_keys).unwrap_or(true) && enabled;
    let gesture = lookup_gesture(status, gesture_keys);

    Some(HandPose {
        x,
        y,
        tracking,
        gesture,
    })
}

/// Extract zero, one, or two hand poses (plus the single-pointer fallback)
/// from an arbitrary status object. Returns `None` when nothing in the
/// payload yields a usable coordinate pair.
pub fn read_hands(status: &Value, fallback_dims: FrameDims) -> Option<NormalizedHands> {
    if !status.is_object() {
        return None;
    }

    let enabled = lookup_bool(status, &["enabled"]).unwrap_or(true);
    let dims = frame_dims(status, fallback_dims);

    let left = read_hand(
        status,
        LEFT_X,
        LEFT_Y,
        LEFT_TRACKING,
        LEFT_GESTURE,
        dims,
        enabled,
    );
    let right = read_hand(
        status,
        RIGHT_X,
        RIGHT_Y,
        RIGHT_TRACKING,
        RIGHT_GESTURE,
        dims,
        enabled,
    );
    let single = read_hand(
        status,
        SINGLE_X,
        SINGLE_Y,
        SINGLE_TRACKING,
        SINGLE_GESTURE,
        dims,
        enabled,
    );

    if left.is_none() && right.is_none() && single.is_none() {
        return None;
    }

    Some(NormalizedHands {
        left,
        right,
        single,
    })
}
