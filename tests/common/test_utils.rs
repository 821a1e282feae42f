use std::{cell::RefCell, collections::HashMap};

use anyhow::Context as _;
use avatar_viewer::{
    loading::LoadingIndicator,
    resources::{AssetSource, LoadProgress},
};

/// Where the "dancing" clip moves the bone of the skinned quad.
pub const DANCE_OFFSET: [f32; 3] = [3.0, 0.0, 0.0];

/// Collects binary data and its buffer views, 4-byte aligned.
#[derive(Default)]
struct BinWriter {
    data: Vec<u8>,
    views: Vec<(usize, usize)>,
}

impl BinWriter {
    fn align(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    fn f32s(&mut self, values: &[f32]) -> usize {
        self.align();
        let offset = self.data.len();
        values
            .iter()
            .for_each(|v| self.data.extend_from_slice(&v.to_le_bytes()));
        self.views.push((offset, self.data.len() - offset));
        self.views.len() - 1
    }

    fn u16s(&mut self, values: &[u16]) -> usize {
        self.align();
        let offset = self.data.len();
        values
            .iter()
            .for_each(|v| self.data.extend_from_slice(&v.to_le_bytes()));
        self.views.push((offset, self.data.len() - offset));
        self.views.len() - 1
    }

    fn views_json(&self) -> String {
        let views: Vec<String> = self
            .views
            .iter()
            .map(|(offset, length)| {
                format!(
                    r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#,
                    offset, length
                )
            })
            .collect();
        format!("[{}]", views.join(","))
    }

    fn finish(mut self) -> Vec<u8> {
        self.align();
        self.data
    }
}

/// Wrap a JSON document and its binary chunk into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

/// JSON and binary buffer of a unit quad in the xy plane (x in -0.5..0.5,
/// y in 0..1, facing +z), skinned to a single bone.
///
/// The "pointing" clip (2s) keeps the bone at the origin, the "dancing"
/// clip (1s) holds it at [`DANCE_OFFSET`].
pub fn skinned_quad(buffer_uri: Option<&str>) -> (String, Vec<u8>) {
    let mut bin = BinWriter::default();
    let positions = bin.f32s(&[
        -0.5, 0.0, 0.0, //
        0.5, 0.0, 0.0, //
        0.5, 1.0, 0.0, //
        -0.5, 1.0, 0.0,
    ]);
    let normals = bin.f32s(&[0.0, 0.0, 1.0].repeat(4));
    let joints = bin.u16s(&[0, 0, 0, 0].repeat(4));
    let weights = bin.f32s(&[1.0, 0.0, 0.0, 0.0].repeat(4));
    let indices = bin.u16s(&[0, 1, 2, 0, 2, 3]);
    let inverse_bind = bin.f32s(&[
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);
    let pointing_times = bin.f32s(&[0.0, 2.0]);
    let pointing_values = bin.f32s(&[0.0; 6]);
    let dancing_times = bin.f32s(&[0.0, 1.0]);
    let [dx, dy, dz] = DANCE_OFFSET;
    let dancing_values = bin.f32s(&[dx, dy, dz, dx, dy, dz]);

    let views = bin.views_json();
    let data = bin.finish();
    let uri = buffer_uri
        .map(|uri| format!(r#","uri":"{}""#, uri))
        .unwrap_or_default();

    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [
    {{"name": "Armature", "children": [1, 2]}},
    {{"name": "Body", "mesh": 0, "skin": 0}},
    {{"name": "Bone"}}
  ],
  "meshes": [{{
    "name": "Body",
    "primitives": [{{
      "attributes": {{"POSITION": 0, "NORMAL": 1, "JOINTS_0": 2, "WEIGHTS_0": 3}},
      "indices": 4
    }}]
  }}],
  "skins": [{{"joints": [2], "inverseBindMatrices": 5}}],
  "animations": [
    {{
      "name": "pointing",
      "samplers": [{{"input": 6, "output": 7, "interpolation": "LINEAR"}}],
      "channels": [{{"sampler": 0, "target": {{"node": 2, "path": "translation"}}}}]
    }},
    {{
      "name": "dancing",
      "samplers": [{{"input": 8, "output": 9, "interpolation": "LINEAR"}}],
      "channels": [{{"sampler": 0, "target": {{"node": 2, "path": "translation"}}}}]
    }}
  ],
  "accessors": [
    {{"bufferView": {positions}, "componentType": 5126, "count": 4, "type": "VEC3", "min": [-0.5, 0.0, 0.0], "max": [0.5, 1.0, 0.0]}},
    {{"bufferView": {normals}, "componentType": 5126, "count": 4, "type": "VEC3"}},
    {{"bufferView": {joints}, "componentType": 5123, "count": 4, "type": "VEC4"}},
    {{"bufferView": {weights}, "componentType": 5126, "count": 4, "type": "VEC4"}},
    {{"bufferView": {indices}, "componentType": 5123, "count": 6, "type": "SCALAR"}},
    {{"bufferView": {inverse_bind}, "componentType": 5126, "count": 1, "type": "MAT4"}},
    {{"bufferView": {pointing_times}, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [2.0]}},
    {{"bufferView": {pointing_values}, "componentType": 5126, "count": 2, "type": "VEC3"}},
    {{"bufferView": {dancing_times}, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0]}},
    {{"bufferView": {dancing_values}, "componentType": 5126, "count": 2, "type": "VEC3"}}
  ],
  "bufferViews": {views},
  "buffers": [{{"byteLength": {length}{uri}}}]
}}"#,
        length = data.len(),
    );
    (json, data)
}

pub fn skinned_quad_glb() -> Vec<u8> {
    let (json, bin) = skinned_quad(None);
    glb(&json, &bin)
}

/// A single static triangle without normals, tinted blue, with an extra
/// unused node so the scene root is not node 0.
pub fn decor_glb() -> Vec<u8> {
    let mut bin = BinWriter::default();
    let positions = bin.f32s(&[
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0,
    ]);
    let views = bin.views_json();
    let data = bin.finish();
    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [1]}}],
  "nodes": [
    {{"name": "Unused"}},
    {{"name": "Diamond", "mesh": 0, "translation": [0.0, 1.0, 0.0]}}
  ],
  "materials": [{{
    "name": "Gem",
    "doubleSided": true,
    "pbrMetallicRoughness": {{"baseColorFactor": [0.2, 0.4, 0.8, 1.0], "metallicFactor": 0.5, "roughnessFactor": 0.25}}
  }}],
  "meshes": [{{"name": "Diamond", "primitives": [{{"attributes": {{"POSITION": 0}}, "material": 0}}]}}],
  "accessors": [
    {{"bufferView": {positions}, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}}
  ],
  "bufferViews": {views},
  "buffers": [{{"byteLength": {length}}}]
}}"#,
        length = data.len(),
    );
    glb(&json, &data)
}

/// Serves files from memory in fixed size chunks.
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    chunk_size: usize,
    report_length: bool,
    fetched: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            chunk_size: 64,
            report_length: true,
            fetched: RefCell::new(Vec::new()),
        }
    }

    /// The default avatar and decor paths, both present.
    pub fn with_viewer_models() -> Self {
        Self::new()
            .with_file("myanimation.glb", skinned_quad_glb())
            .with_file("diamond.glb", decor_glb())
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Behave like a server that sends no content length.
    pub fn without_length(mut self) -> Self {
        self.report_length = false;
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str, progress: &mut dyn FnMut(LoadProgress)) -> anyhow::Result<Vec<u8>> {
        self.fetched.borrow_mut().push(path.to_string());
        let data = self
            .files
            .get(path)
            .with_context(|| format!("{} not found", path))?;
        let total = self.report_length.then_some(data.len() as u64);
        progress(LoadProgress { loaded: 0, total });
        let mut loaded = 0;
        for chunk in data.chunks(self.chunk_size) {
            loaded += chunk.len() as u64;
            progress(LoadProgress { loaded, total });
        }
        Ok(data.clone())
    }
}

/// Remembers everything shown on it.
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    pub texts: Vec<String>,
    pub hidden: bool,
}

impl LoadingIndicator for RecordingIndicator {
    fn set_text(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }

    fn hide(&mut self) {
        self.hidden = true;
    }
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
