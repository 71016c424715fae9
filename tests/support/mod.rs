#![allow(dead_code)]

use std::path::PathBuf;

use avatar_stage::{AssetRoot, HeadlessRenderer, StageConfig, StageSession};

/// Temp directory holding a complete stage: rig, clips, audio and `stage.json`.
pub struct Fixture {
    pub dir: PathBuf,
}

impl Fixture {
    pub fn empty(name: &str) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "avatar_stage_{name}_{}_{nanos}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    /// Idle loop plus reactions:
    /// - `yes`: 2.0 s mapped clip, 3.5 s audio, `happy`
    /// - `no`: 1.0 s mapped clip, 1.5 s audio, `angry`
    /// - `nod`: 1.0 s native clip, no audio
    /// - `broken`: valid clip, audio path that does not exist
    /// - `twisted`: mapped clip without a root translation track
    pub fn standard(name: &str) -> Self {
        let f = Self::empty(name);
        f.write("rig/avatar.json", RIG);
        f.write("anim/idle.json", &native_clip("idle", 4.0));
        f.write("anim/nod.json", &native_clip("nod", 1.0));
        f.write("anim/yes.json", &mapped_clip("yes", 2.0, true));
        f.write("anim/no.json", &mapped_clip("no", 1.0, true));
        f.write("anim/twisted.json", &mapped_clip("twisted", 1.0, false));
        f.write_wav("audio/yes.wav", 3.5);
        f.write_wav("audio/no.wav", 1.5);
        f.write("stage.json", STAGE);
        f
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// Mono 8 kHz sine at half amplitude.
    pub fn write_wav(&self, rel: &str, secs: f32) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        let n = (secs * 8_000.0).round() as usize;
        for i in 0..n {
            let t = i as f32 / 8_000.0;
            let v = (t * 220.0 * std::f32::consts::TAU).sin() * 0.5;
            writer.write_sample((v * f32::from(i16::MAX)) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("stage.json")
    }

    pub fn config(&self) -> StageConfig {
        StageConfig::from_path(&self.config_path()).unwrap()
    }

    /// Loaded session with a headless renderer.
    pub fn session(&self) -> StageSession {
        self.session_with(self.config())
    }

    pub fn session_with(&self, config: StageConfig) -> StageSession {
        let root = AssetRoot::new(&self.dir);
        let mut session =
            StageSession::new(config, root, Box::new(HeadlessRenderer::new())).unwrap();
        session.load();
        session
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Tick `session` at 60 Hz for `secs` seconds.
pub fn run(session: &mut StageSession, secs: f32) {
    let dt = 1.0 / 60.0;
    let steps = (secs / dt).round() as usize;
    for _ in 0..steps {
        session.tick(dt);
    }
}

const RIG: &str = r#"{
  "bones": [
    {"name": "Hips", "translation": [0.0, 1.0, 0.0]},
    {"name": "Spine", "parent": "Hips", "translation": [0.0, 0.2, 0.0]},
    {"name": "Head", "parent": "Spine", "translation": [0.0, 0.3, 0.0]}
  ],
  "humanoid": {"hips": "Hips", "spine": "Spine", "head": "Head"}
}"#;

const STAGE: &str = r#"{
  "rig": "rig/avatar.json",
  "expressions": ["happy", "angry", "sad"],
  "seed": 7,
  "actions": [
    {"name": "idle", "animation": {"path": "anim/idle.json", "convention": "native"}},
    {"name": "yes", "animation": {"path": "anim/yes.json"}, "audio": "audio/yes.wav",
     "expression": "happy"},
    {"name": "no", "animation": {"path": "anim/no.json"}, "audio": "audio/no.wav",
     "expression": "angry"},
    {"name": "nod", "animation": {"path": "anim/nod.json", "convention": "native"},
     "expression": "sad"},
    {"name": "broken", "animation": {"path": "anim/nod.json", "convention": "native"},
     "audio": "audio/missing.wav"},
    {"name": "twisted", "animation": {"path": "anim/twisted.json"}}
  ]
}"#;

fn native_clip(name: &str, secs: f32) -> String {
    format!(
        r#"{{"name": "{name}", "tracks": [
          {{"bone": "head", "kind": "rotation", "times": [0.0, {secs}],
            "values": [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0998, 0.0, 0.995]]}}
        ]}}"#
    )
}

fn mapped_clip(name: &str, secs: f32, root_translation: bool) -> String {
    let half = secs / 2.0;
    let root = if root_translation {
        format!(
            r#"{{"bone": "mixamorig:Hips", "kind": "translation", "times": [0.0, {secs}],
              "values": [[0.0, 100.0, 0.0], [4.0, 95.0, 0.0]]}},"#
        )
    } else {
        String::new()
    };
    format!(
        r#"{{"name": "{name}",
          "skeleton": {{"mixamorig:Hips": [0.0, 100.0, 0.0], "mixamorig:Head": [0.0, 30.0, 0.0]}},
          "tracks": [
            {root}
            {{"bone": "mixamorig:Head", "kind": "rotation", "times": [0.0, {half}, {secs}],
              "values": [[0.0, 0.0, 0.0, 1.0], [0.2588, 0.0, 0.0, 0.9659], [0.0, 0.0, 0.0, 1.0]]}},
            {{"bone": "mixamorig:LeftFoot", "kind": "rotation", "times": [0.0, {secs}],
              "values": [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]]}}
          ]}}"#
    )
}
