use crate::foundation::core::{Lerp, Quat, Vec3};
use crate::foundation::error::{StageError, StageResult};

/// Keyframe values of one track; the variant decides which bone channel is driven.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackValues {
    /// Local rotation keys (`[x, y, z, w]`).
    Rotation(Vec<Quat>),
    /// Local translation keys.
    Translation(Vec<Vec3>),
}

impl TrackValues {
    /// Number of keys.
    pub fn len(&self) -> usize {
        match self {
            Self::Rotation(v) => v.len(),
            Self::Translation(v) => v.len(),
        }
    }

    /// Return `true` when there are no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One keyframe track targeting a single bone.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TrackDef", into = "TrackDef")]
pub struct Track {
    /// Bone (node) name the track drives.
    pub bone: String,
    /// Key timestamps in seconds, sorted ascending.
    pub times: Vec<f32>,
    /// Key values, one per timestamp.
    pub values: TrackValues,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum TrackKind {
    Rotation,
    Translation,
}

/// Wire shape of a track: `{ "bone", "times", "kind", "values": [[..], ..] }`.
#[derive(serde::Serialize, serde::Deserialize)]
struct TrackDef {
    bone: String,
    times: Vec<f32>,
    kind: TrackKind,
    values: Vec<Vec<f32>>,
}

impl TryFrom<TrackDef> for Track {
    type Error = String;

    fn try_from(def: TrackDef) -> Result<Self, Self::Error> {
        let arity = match def.kind {
            TrackKind::Rotation => 4,
            TrackKind::Translation => 3,
        };
        if let Some(bad) = def.values.iter().find(|v| v.len() != arity) {
            return Err(format!(
                "track for bone '{}' expects {arity} components per key, got {}",
                def.bone,
                bad.len()
            ));
        }
        let values = match def.kind {
            TrackKind::Rotation => TrackValues::Rotation(
                def.values
                    .iter()
                    .map(|v| Quat::from_xyzw(v[0], v[1], v[2], v[3]))
                    .collect(),
            ),
            TrackKind::Translation => TrackValues::Translation(
                def.values
                    .iter()
                    .map(|v| Vec3::new(v[0], v[1], v[2]))
                    .collect(),
            ),
        };
        Ok(Self {
            bone: def.bone,
            times: def.times,
            values,
        })
    }
}

impl From<Track> for TrackDef {
    fn from(track: Track) -> Self {
        let (kind, values) = match track.values {
            TrackValues::Rotation(v) => (
                TrackKind::Rotation,
                v.iter().map(|q| q.to_array().to_vec()).collect(),
            ),
            TrackValues::Translation(v) => (
                TrackKind::Translation,
                v.iter().map(|t| t.to_array().to_vec()).collect(),
            ),
        };
        Self {
            bone: track.bone,
            times: track.times,
            kind,
            values,
        }
    }
}

/// Sampled value of one track at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackSample {
    /// Local rotation.
    Rotation(Quat),
    /// Local translation.
    Translation(Vec3),
}

impl Track {
    /// Build a rotation track.
    pub fn rotation(bone: impl Into<String>, times: Vec<f32>, values: Vec<Quat>) -> Self {
        Self {
            bone: bone.into(),
            times,
            values: TrackValues::Rotation(values),
        }
    }

    /// Build a translation track.
    pub fn translation(bone: impl Into<String>, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        Self {
            bone: bone.into(),
            times,
            values: TrackValues::Translation(values),
        }
    }

    /// Return `true` for translation tracks.
    pub fn is_translation(&self) -> bool {
        matches!(self.values, TrackValues::Translation(_))
    }

    /// Timestamp of the last key, or 0 for empty tracks.
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Validate key ordering and value counts.
    pub fn validate(&self) -> StageResult<()> {
        if self.times.is_empty() {
            return Err(StageError::asset(format!(
                "track for bone '{}' has no keys",
                self.bone
            )));
        }
        if self.times.len() != self.values.len() {
            return Err(StageError::asset(format!(
                "track for bone '{}' has {} times but {} values",
                self.bone,
                self.times.len(),
                self.values.len()
            )));
        }
        if self.times.iter().any(|t| !t.is_finite()) {
            return Err(StageError::asset(format!(
                "track for bone '{}' has non-finite timestamps",
                self.bone
            )));
        }
        if !self.times.windows(2).all(|w| w[0] <= w[1]) {
            return Err(StageError::asset(format!(
                "track for bone '{}' keys must be sorted by time",
                self.bone
            )));
        }
        Ok(())
    }

    /// Sample the track at `time` seconds; times outside the key range hold the end keys.
    pub fn sample(&self, time: f32) -> Option<TrackSample> {
        match &self.values {
            TrackValues::Rotation(v) => {
                sample_keys(&self.times, v, time).map(|q| TrackSample::Rotation(q.normalize()))
            }
            TrackValues::Translation(v) => {
                sample_keys(&self.times, v, time).map(TrackSample::Translation)
            }
        }
    }
}

fn sample_keys<T: Lerp + Copy>(times: &[f32], values: &[T], time: f32) -> Option<T> {
    let len = times.len().min(values.len());
    if len == 0 {
        return None;
    }

    let idx = times[..len].partition_point(|t| *t <= time);
    if idx == 0 {
        return Some(values[0]);
    }
    if idx >= len {
        return Some(values[len - 1]);
    }

    let (t0, t1) = (times[idx - 1], times[idx]);
    let span = t1 - t0;
    if span <= 0.0 {
        return Some(values[idx - 1]);
    }
    let t = ((time - t0) / span).clamp(0.0, 1.0);
    Some(T::lerp(&values[idx - 1], &values[idx], t))
}

/// A named animation clip: a set of bone tracks sharing one timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    /// Clip name (usually the source file stem).
    pub name: String,
    /// Playback length in seconds; `0` in asset files means "derive from the keys".
    #[serde(default)]
    pub duration: f32,
    /// Bone tracks.
    pub tracks: Vec<Track>,
}

impl Clip {
    /// Build a clip whose duration is the last key time across all tracks.
    pub fn from_tracks(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Fill in a missing duration from the last key time.
    pub fn with_derived_duration(mut self) -> Self {
        if self.duration <= 0.0 {
            self.duration = self.tracks.iter().map(Track::end_time).fold(0.0f32, f32::max);
        }
        self
    }

    /// Validate every track and the clip duration.
    pub fn validate(&self) -> StageResult<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(StageError::asset(format!(
                "clip '{}' has invalid duration {}",
                self.name, self.duration
            )));
        }
        for track in &self.tracks {
            track.validate()?;
        }
        Ok(())
    }

    /// Find the first track for `bone` of the requested channel.
    pub fn track(&self, bone: &str, translation: bool) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.bone == bone && t.is_translation() == translation)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/clip.rs"]
mod tests;
