//! Complete model, external strings, shader archive and shader container files.

use crate::data::binary_file::signature;
use crate::data::dict::DIC_HEADER_SIZE;
use crate::models::bfres::{OPTIONS_OFFSET, RES_FILE_SIZE, file_options};
use crate::models::bfsha::SHADER_FILE_SIZE;
use crate::testing::FileBuilder;

/// The string an external strings file substitutes for unknown keys.
pub const EXTERNAL_DEFAULT: &str = "";

pub const VERTEX_CODE: &[u8] = b"\x7fvertex-code\x00\x01\x02";
pub const PIXEL_CODE: &[u8] = b"\x7fpixel-code\x03\x04";
pub const CONTROL_DATA: &[u8] = b"control-section";

/// Program of [`material_archive`] matching the fixture material with no skinning weights.
pub const MATERIAL_PROGRAM_WEIGHT_0: usize = 1;
/// Program of [`material_archive`] matching the fixture material with two weights.
pub const MATERIAL_PROGRAM_WEIGHT_2: usize = 3;

const EXTERNAL_NAMES: [&str; 8] = [
    "albedo_color",
    "gsys_depth_bias",
    "gsys_pass",
    "gsys_priority",
    "gsys_render_state_mode",
    "o_blend_mode",
    "o_enable_fog",
    "o_use_vtx_color",
];

/// Key an external string is stored under: 64-bit FNV-1a of its bytes.
pub fn string_key(value: &str) -> u64 {
    let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
    for byte in value.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash.max(1)
}

/// An external strings file holding [`EXTERNAL_NAMES`].
pub fn external_strings_file() -> Vec<u8> {
    let mut names = EXTERNAL_NAMES.to_vec();
    names.sort_by_key(|name| string_key(name));

    let mut b = FileBuilder::with_header_size(signature::RES_FILE, RES_FILE_SIZE);
    b.write_string_ptr(0x20, "ExternalBinaryString");

    let keys = b.alloc(names.len() * 8, 8);
    for (i, name) in names.iter().enumerate() {
        b.write_u64(keys + i * 8, string_key(name));
    }
    b.write_ptr(0xB8, keys);
    let dict = b.write_dict(&names);
    b.write_ptr(0xC0, dict);
    b.write_string_ptr(0xD0, EXTERNAL_DEFAULT);
    b.finish()
}

/// Variations of [`model_file`].
#[derive(Debug, Clone)]
pub struct ModelFixture {
    /// Store render info, shader param and animation names as external string keys.
    pub external_strings: bool,
    /// With external strings, mark the static option dictionary as already resolved.
    pub static_option_root_filled: bool,
    /// Value of the material's `gsys_render_state_mode` render info.
    pub render_state: &'static str,
}

impl Default for ModelFixture {
    fn default() -> Self {
        Self {
            external_strings: false,
            static_option_root_filled: false,
            render_state: "translucent",
        }
    }
}

impl ModelFixture {
    fn write_name(&self, b: &mut FileBuilder, at: usize, name: &str) {
        if self.external_strings {
            b.write_u64(at, string_key(name));
        } else {
            b.write_string_ptr(at, name);
        }
    }

    /// Dictionary over names that are external string keys in external mode.
    fn write_name_dict(&self, b: &mut FileBuilder, names: &[&str]) -> usize {
        if self.external_strings {
            b.write_dict_raw(names, &vec![0; names.len()])
        } else {
            b.write_dict(names)
        }
    }
}

const RENDER_INFO_NAMES: [&str; 3] = ["gsys_render_state_mode", "gsys_priority", "gsys_depth_bias"];
const SHADER_PARAM_NAMES: [&str; 2] = ["albedo_color", "unknown_param"];
const STATIC_OPTION_NAMES: [&str; 3] = ["o_blend_mode", "o_enable_fog", "o_use_vtx_color"];

/// A model file "TestModel" with one model: a two-bone skeleton, one vertex buffer, one
/// shape and the material "Mt_Body", plus the material animation "Blink".
pub fn model_file(fixture: &ModelFixture) -> Vec<u8> {
    let mut b = FileBuilder::with_header_size(signature::RES_FILE, RES_FILE_SIZE);
    b.write_string_ptr(0x20, "TestModel");

    let model = b.alloc(0x78, 8);
    b.write_ptr(0x28, model);
    b.write_u16(0xDC, 1);
    let dict = b.write_dict(&["TestModel"]);
    b.write_ptr(0x30, dict);
    b.write_string_ptr(model + 0x8, "TestModel");

    write_skeleton(&mut b, model);
    let vertex = write_vertex(&mut b, model);
    write_shape(&mut b, model, vertex);
    let reflection = write_reflection(&mut b, fixture, model);
    write_material(&mut b, fixture, model, reflection);
    write_material_anim(&mut b, fixture);

    if fixture.external_strings {
        b.write_u8(
            OPTIONS_OFFSET,
            file_options::HAS_EXTERNAL_STRINGS | file_options::EXTERNAL_STRINGS_PENDING,
        );
    }
    b.finish()
}

fn write_skeleton(b: &mut FileBuilder, model: usize) {
    let skeleton = b.alloc(0x40, 8);
    b.write_ptr(model + 0x18, skeleton);
    let bones = b.alloc(2 * 0x58, 8);
    b.write_ptr(skeleton + 0x10, bones);
    let dict = b.write_dict(&["Root", "Spine"]);
    b.write_ptr(skeleton + 0x8, dict);
    b.write_u16(skeleton + 0x38, 2);
    b.write_u16(skeleton + 0x3A, 2);

    for (i, (name, parent)) in [("Root", u16::MAX), ("Spine", 0)].into_iter().enumerate() {
        let bone = bones + i * 0x58;
        b.write_string_ptr(bone, name);
        b.write_u16(bone + 0x20, i as u16);
        b.write_u16(bone + 0x22, parent);
        b.write_u16(bone + 0x24, i as u16);
        b.write_u16(bone + 0x26, u16::MAX);
        b.write_u16(bone + 0x28, u16::MAX);
        if i == 1 {
            b.write_f32(bone + 0x34, 1.0);
        }
        // rotation w, then unit scale
        b.write_f32(bone + 0x48, 1.0);
        for axis in 0..3 {
            b.write_f32(bone + 0x4C + axis * 4, 1.0);
        }
    }
}

fn write_vertex(b: &mut FileBuilder, model: usize) -> usize {
    let vertex = b.alloc(0x58, 8);
    b.write_ptr(model + 0x20, vertex);
    b.write_u16(model + 0x68, 1);

    let attributes = b.alloc(0x10, 8);
    b.write_string_ptr(attributes, "_p0");
    b.write_u32(attributes + 0x8, 0x0000_0E20);
    b.write_ptr(vertex + 0x8, attributes);
    let dict = b.write_dict(&["_p0"]);
    b.write_ptr(vertex + 0x10, dict);

    let buffer_info = b.alloc(0x10, 8);
    b.write_i32(buffer_info, 12);
    b.write_ptr(vertex + 0x38, buffer_info);
    b.write_u8(vertex + 0x4C, 1);
    b.write_u8(vertex + 0x4D, 1);
    b.write_u32(vertex + 0x50, 4);
    vertex
}

fn write_shape(b: &mut FileBuilder, model: usize, vertex: usize) {
    let shape = b.alloc(0x60, 8);
    b.write_ptr(model + 0x28, shape);
    b.write_u16(model + 0x6A, 1);
    let dict = b.write_dict(&["Body__Mt_Body"]);
    b.write_ptr(model + 0x30, dict);

    b.write_string_ptr(shape + 0x8, "Body__Mt_Body");
    b.write_ptr(shape + 0x10, vertex);
    let skin = b.alloc(4, 8);
    b.write_u16(skin, 0);
    b.write_u16(skin + 2, 1);
    b.write_ptr(shape + 0x20, skin);
    b.write_u16(shape + 0x52, 0);
    b.write_u16(shape + 0x58, 2);
    b.write_u8(shape + 0x5A, 2);
    b.write_u8(shape + 0x5B, 1);

    let mesh = b.alloc(0x38, 8);
    b.write_ptr(shape + 0x18, mesh);
    let ranges = b.alloc(8, 8);
    b.write_u32(ranges, 0);
    b.write_u32(ranges + 4, 6);
    b.write_ptr(mesh, ranges);
    b.write_u32(mesh + 0x24, 3);
    b.write_u32(mesh + 0x28, 1);
    b.write_u32(mesh + 0x2C, 6);
    b.write_u16(mesh + 0x34, 1);
}

fn write_reflection(b: &mut FileBuilder, fixture: &ModelFixture, model: usize) -> usize {
    let reflection = b.alloc(0x58, 8);
    b.write_ptr(model + 0x48, reflection);
    b.write_u16(model + 0x6E, 1);
    b.write_string_ptr(reflection, "material");
    b.write_string_ptr(reflection + 0x8, "material");

    let infos = b.alloc(RENDER_INFO_NAMES.len() * 0x10, 8);
    for (i, (name, value_type)) in RENDER_INFO_NAMES.iter().zip([2u8, 0, 1]).enumerate() {
        fixture.write_name(b, infos + i * 0x10, name);
        b.write_u8(infos + i * 0x10 + 0x8, value_type);
    }
    b.write_ptr(reflection + 0x10, infos);
    let dict = fixture.write_name_dict(b, &RENDER_INFO_NAMES);
    b.write_ptr(reflection + 0x18, dict);

    let params = b.alloc(SHADER_PARAM_NAMES.len() * 0x18, 8);
    for (i, name) in SHADER_PARAM_NAMES.iter().enumerate() {
        let param = params + i * 0x18;
        fixture.write_name(b, param + 0x8, name);
        b.write_u16(param + 0x10, (i * 0x10) as u16);
    }
    b.write_ptr(reflection + 0x20, params);
    let dict = fixture.write_name_dict(b, &SHADER_PARAM_NAMES);
    b.write_ptr(reflection + 0x28, dict);

    b.write_u16(reflection + 0x48, RENDER_INFO_NAMES.len() as u16);
    b.write_u16(reflection + 0x4A, SHADER_PARAM_NAMES.len() as u16);
    b.write_u16(reflection + 0x4C, 0x20);

    let dict = b.write_dict(&["_p0"]);
    b.write_ptr(reflection + 0x30, dict);
    let dict = b.write_dict(&["_a0", "_n0"]);
    b.write_ptr(reflection + 0x38, dict);

    let dict = if fixture.external_strings {
        let keys: Vec<u64> = STATIC_OPTION_NAMES.iter().map(|name| string_key(name)).collect();
        let dict = b.write_dict_raw(&STATIC_OPTION_NAMES, &keys);
        if fixture.static_option_root_filled {
            b.write_string_ptr(dict + DIC_HEADER_SIZE + 0x8, EXTERNAL_DEFAULT);
        }
        dict
    } else {
        b.write_dict(&STATIC_OPTION_NAMES)
    };
    b.write_ptr(reflection + 0x40, dict);
    reflection
}

fn write_material(b: &mut FileBuilder, fixture: &ModelFixture, model: usize, reflection: usize) {
    let material = b.alloc(0xB0, 8);
    b.write_ptr(model + 0x38, material);
    b.write_u16(model + 0x6C, 1);
    let dict = b.write_dict(&["Mt_Body"]);
    b.write_ptr(model + 0x40, dict);
    b.write_string_ptr(material + 0x8, "Mt_Body");

    // Static options: o_enable_fog = true, o_use_vtx_color = false, o_blend_mode = "2",
    // stored booleans first and named through the index array.
    let shader_data = b.alloc(0x50, 8);
    b.write_ptr(material + 0x10, shader_data);
    b.write_ptr(shader_data, reflection);
    let names = b.write_string_array(&["_p0"]);
    b.write_ptr(shader_data + 0x8, names);
    let names = b.write_string_array(&["_a0", "_n0"]);
    b.write_ptr(shader_data + 0x18, names);
    let bits = b.alloc(8, 8);
    b.write_u64(bits, 0b01);
    b.write_ptr(shader_data + 0x28, bits);
    let strings = b.write_string_array(&["2"]);
    b.write_ptr(shader_data + 0x30, strings);
    let indices = b.alloc(6, 8);
    for (i, index) in [1u16, 2, 0].into_iter().enumerate() {
        b.write_u16(indices + i * 2, index);
    }
    b.write_ptr(shader_data + 0x38, indices);
    b.write_u8(shader_data + 0x44, 1);
    b.write_u8(shader_data + 0x45, 2);
    b.write_u16(shader_data + 0x46, 2);
    b.write_u16(shader_data + 0x48, 3);

    let textures = b.write_string_array(&["Body_Alb", "Body_Nrm"]);
    b.write_ptr(material + 0x20, textures);
    let samplers = b.write_dict(&["_a0", "_n0"]);
    b.write_ptr(material + 0x38, samplers);

    let values = b.alloc(0x18, 8);
    b.write_string_ptr(values, fixture.render_state);
    b.write_i32(values + 0x8, 3);
    b.write_f32(values + 0xC, 0.5);
    b.write_f32(values + 0x10, 1.5);
    b.write_ptr(material + 0x40, values);
    let counts = b.alloc(6, 8);
    let offsets = b.alloc(6, 8);
    for (i, (count, offset)) in [(1u16, 0u16), (1, 0x8), (2, 0xC)].into_iter().enumerate() {
        b.write_u16(counts + i * 2, count);
        b.write_u16(offsets + i * 2, offset);
    }
    b.write_ptr(material + 0x48, counts);
    b.write_ptr(material + 0x50, offsets);

    let user_data = b.alloc(0x40, 8);
    b.write_string_ptr(user_data, "lod_bias");
    let ints = b.alloc(8, 8);
    b.write_i32(ints, 7);
    b.write_i32(ints + 4, 8);
    b.write_ptr(user_data + 0x8, ints);
    b.write_u32(user_data + 0x10, 2);
    b.write_u8(user_data + 0x14, 0);
    b.write_ptr(material + 0x70, user_data);
    let dict = b.write_dict(&["lod_bias"]);
    b.write_ptr(material + 0x78, dict);

    b.write_u16(material + 0xA0, 0);
    b.write_u8(material + 0xA2, 2);
    b.write_u8(material + 0xA3, 2);
    b.write_u16(material + 0xA6, 1);
}

fn write_material_anim(b: &mut FileBuilder, fixture: &ModelFixture) {
    let anim = b.alloc(0x70, 8);
    b.write_ptr(0x68, anim);
    b.write_u16(0xE4, 1);
    let dict = b.write_dict(&["Blink"]);
    b.write_ptr(0x70, dict);
    b.write_string_ptr(anim + 0x8, "Blink");
    b.write_u32(anim + 0x58, 30);
    b.write_u16(anim + 0x62, 1);
    b.write_u16(anim + 0x66, 1);

    let per_material = b.alloc(0x40, 8);
    b.write_ptr(anim + 0x28, per_material);
    b.write_string_ptr(per_material, "Mt_Body");
    let param_anim = b.alloc(0x18, 8);
    b.write_ptr(per_material + 0x8, param_anim);
    b.write_u16(per_material + 0x32, 1);
    fixture.write_name(b, param_anim, "albedo_color");
}

/// One shader option of a [`ShadingModelFixture`].
#[derive(Debug, Clone)]
pub struct OptionFixture {
    pub name: &'static str,
    pub choices: Vec<&'static str>,
    pub default: u16,
    pub index: u8,
    pub mask: u32,
    pub bit_offset: u8,
    pub dynamic_index_offset: u8,
}

impl OptionFixture {
    pub fn new(name: &'static str, choices: &[&'static str], index: u8, mask: u32, bit_offset: u8) -> Self {
        Self {
            name,
            choices: choices.to_vec(),
            default: 0,
            index,
            mask,
            bit_offset,
            dynamic_index_offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShadingModelFixture {
    pub name: &'static str,
    pub static_options: Vec<OptionFixture>,
    pub dynamic_options: Vec<OptionFixture>,
    pub static_key_count: u8,
    pub dynamic_key_count: u8,
    /// One key table row per program.
    pub rows: Vec<Vec<u32>>,
    /// Add samplers, a uniform block, two stages of interface slots and an embedded
    /// container with one variation per program.
    pub with_resources: bool,
}

#[derive(Debug, Clone)]
pub struct ArchiveFixture {
    pub name: &'static str,
    pub models: Vec<ShadingModelFixture>,
}

/// Archive "material" whose model "material" has one static option `test_opt` with
/// choices `choice_a`/`choice_b`, and one program per choice.
pub fn test_opt_archive() -> ArchiveFixture {
    ArchiveFixture {
        name: "material",
        models: vec![ShadingModelFixture {
            name: "material",
            static_options: vec![OptionFixture::new("test_opt", &["choice_a", "choice_b"], 0, 0b1, 0)],
            dynamic_options: Vec::new(),
            static_key_count: 1,
            dynamic_key_count: 0,
            rows: vec![vec![0], vec![1]],
            with_resources: false,
        }],
    }
}

/// Two on/off options packed into bits 0 and 1 of one word, with a program per pattern.
pub fn two_option_archive() -> ArchiveFixture {
    ArchiveFixture {
        name: "material",
        models: vec![ShadingModelFixture {
            name: "material",
            static_options: vec![
                OptionFixture::new("first", &["off", "on"], 0, 0b01, 0),
                OptionFixture::new("second", &["off", "on"], 0, 0b10, 1),
            ],
            dynamic_options: Vec::new(),
            static_key_count: 1,
            dynamic_key_count: 0,
            rows: vec![vec![0b00], vec![0b01], vec![0b10], vec![0b11]],
            with_resources: false,
        }],
    }
}

const BOOL_CHOICES: [&str; 2] = ["0", "1"];

/// Archive the fixture material of [`model_file`] selects from. Static word 0 packs
/// `o_enable_fog` (bit 0), `o_use_vtx_color` (bit 1), `o_blend_mode` (bits 2-3),
/// `gsys_renderstate` (bits 4-5), `gsys_assign_type` (bit 6) and
/// `gsys_alpha_test_enable` (bit 7); the dynamic word holds `gsys_weight`.
pub fn material_archive() -> ArchiveFixture {
    // fog on, blend mode 2, translucent
    const MATERIAL: u32 = 0b10_10_0_1;
    let mut weight = OptionFixture::new("gsys_weight", &["0", "1", "2", "3", "4"], 1, 0b111, 0);
    weight.dynamic_index_offset = 1;
    ArchiveFixture {
        name: "material",
        models: vec![ShadingModelFixture {
            name: "material",
            static_options: vec![
                OptionFixture::new("o_enable_fog", &BOOL_CHOICES, 0, 0x1, 0),
                OptionFixture::new("o_use_vtx_color", &BOOL_CHOICES, 0, 0x2, 1),
                OptionFixture::new("o_blend_mode", &["0", "1", "2"], 0, 0xC, 2),
                OptionFixture::new("gsys_renderstate", &["0", "1", "2", "3"], 0, 0x30, 4),
                OptionFixture::new(
                    "gsys_assign_type",
                    &["gsys_assign_material", "gsys_assign_shape"],
                    0,
                    0x40,
                    6,
                ),
                OptionFixture::new("gsys_alpha_test_enable", &BOOL_CHOICES, 0, 0x80, 7),
            ],
            dynamic_options: vec![weight],
            static_key_count: 1,
            dynamic_key_count: 1,
            rows: vec![
                vec![0, 0],
                vec![MATERIAL, 0],
                vec![MATERIAL, 1],
                vec![MATERIAL, 2],
                vec![MATERIAL, 4],
            ],
            with_resources: true,
        }],
    }
}

const SAMPLER_NAMES: [&str; 2] = ["_a0", "_n0"];
const STAGE_COUNT: usize = 2;
const STAGE_PREFIXES: [&str; STAGE_COUNT] = ["vs", "fs"];

/// Slot the fixture programs bind sampler `index` of the stage with base location `base`
/// to.
pub fn sampler_slot(index: usize, base: usize) -> i32 {
    (index * 10 + base) as i32
}

pub fn shader_file(fixture: &ArchiveFixture) -> Vec<u8> {
    let mut b = FileBuilder::with_header_size(signature::SHADER_ARCHIVE, SHADER_FILE_SIZE);
    let archive = b.alloc(0x48, 8);
    b.write_ptr(0x20, archive);
    b.write_string_ptr(archive, fixture.name);
    b.write_string_ptr(archive + 0x8, &format!("shaders/{}.bfsha", fixture.name));

    let models = b.alloc(fixture.models.len() * 0x100, 8);
    b.write_ptr(archive + 0x10, models);
    let names: Vec<&str> = fixture.models.iter().map(|model| model.name).collect();
    let dict = b.write_dict(&names);
    b.write_ptr(archive + 0x18, dict);
    let containers = fixture.models.iter().filter(|model| model.with_resources).count();
    b.write_u16(archive + 0x38, containers as u16);
    b.write_u16(archive + 0x40, fixture.models.len() as u16);

    for (i, model) in fixture.models.iter().enumerate() {
        write_shading_model(&mut b, models + i * 0x100, model);
    }
    b.finish()
}

fn write_options(b: &mut FileBuilder, options: &[OptionFixture]) -> (usize, usize) {
    let array = b.alloc(options.len().max(1) * 0x28, 8);
    for (i, fixture) in options.iter().enumerate() {
        let option = array + i * 0x28;
        b.write_string_ptr(option, fixture.name);
        let choices = b.write_dict(&fixture.choices);
        b.write_ptr(option + 0x8, choices);
        let values = b.alloc(fixture.choices.len() * 4, 8);
        for choice in 0..fixture.choices.len() {
            b.write_u32(values + choice * 4, choice as u32);
        }
        b.write_ptr(option + 0x10, values);
        b.write_u16(option + 0x18, fixture.choices.len() as u16);
        b.write_u16(option + 0x1A, fixture.default);
        b.write_u8(option + 0x1F, fixture.dynamic_index_offset);
        b.write_u32(option + 0x20, fixture.mask);
        b.write_u8(option + 0x24, fixture.index);
        b.write_u8(option + 0x25, fixture.bit_offset);
    }
    let names: Vec<&str> = options.iter().map(|option| option.name).collect();
    let dict = b.write_dict(&names);
    (array, dict)
}

fn write_shading_model(b: &mut FileBuilder, model: usize, fixture: &ShadingModelFixture) {
    b.write_string_ptr(model, fixture.name);

    let (options, dict) = write_options(b, &fixture.static_options);
    b.write_ptr(model + 0x8, options);
    b.write_ptr(model + 0x10, dict);
    let (options, dict) = write_options(b, &fixture.dynamic_options);
    b.write_ptr(model + 0x18, options);
    b.write_ptr(model + 0x20, dict);
    b.write_u16(model + 0xE4, fixture.static_options.len() as u16);
    b.write_u16(model + 0xE6, fixture.dynamic_options.len() as u16);

    let key_length = (fixture.static_key_count + fixture.dynamic_key_count) as usize;
    let table = b.alloc(fixture.rows.len() * key_length * 4, 8);
    for (row_index, row) in fixture.rows.iter().enumerate() {
        for (word_index, word) in row.iter().enumerate() {
            b.write_u32(table + (row_index * key_length + word_index) * 4, *word);
        }
    }
    b.write_ptr(model + 0x90, table);
    let programs = b.alloc(fixture.rows.len() * 0x40, 8);
    b.write_ptr(model + 0x88, programs);
    b.write_u16(model + 0xE8, fixture.rows.len() as u16);
    b.write_i32(model + 0xE0, 0);
    b.write_u8(model + 0xEA, fixture.static_key_count);
    b.write_u8(model + 0xEB, fixture.dynamic_key_count);

    for offset in 0xF0..=0xF3 {
        b.write_i8(model + offset, -1);
    }
    for offset in 0xF9..=0xFE {
        b.write_i8(model + offset, -1);
    }

    if fixture.with_resources {
        write_model_resources(b, model, programs, fixture.rows.len());
    }
}

fn write_model_resources(b: &mut FileBuilder, model: usize, programs: usize, program_count: usize) {
    let attributes = b.alloc(4, 8);
    for i in 0..2 {
        b.write_u8(attributes + i * 2, i as u8);
        b.write_i8(attributes + i * 2 + 1, i as i8);
    }
    b.write_ptr(model + 0x28, attributes);
    let dict = b.write_dict(&["_p0", "_u0"]);
    b.write_ptr(model + 0x30, dict);
    b.write_u8(model + 0xEC, 2);

    let samplers = b.alloc(SAMPLER_NAMES.len() * 0x10, 8);
    for (i, name) in SAMPLER_NAMES.iter().enumerate() {
        b.write_string_ptr(samplers + i * 0x10, name);
        b.write_u8(samplers + i * 0x10 + 0x8, i as u8);
    }
    b.write_ptr(model + 0x38, samplers);
    let dict = b.write_dict(&SAMPLER_NAMES);
    b.write_ptr(model + 0x40, dict);
    b.write_u8(model + 0xED, SAMPLER_NAMES.len() as u8);

    let block = b.alloc(0x20, 8);
    let members = b.alloc(2 * 0x10, 8);
    for (i, offset) in [0u16, 0x10].into_iter().enumerate() {
        b.write_u32(members + i * 0x10 + 0x8, i as u32);
        b.write_u16(members + i * 0x10 + 0xC, offset);
    }
    b.write_ptr(block, members);
    let dict = b.write_dict(&["albedo_color", "emission_scale"]);
    b.write_ptr(block + 0x8, dict);
    let default_value = b.alloc(0x20, 8);
    b.write_f32(default_value, 1.0);
    b.write_ptr(block + 0x10, default_value);
    b.write_u8(block + 0x19, 1);
    b.write_u16(block + 0x1A, 0x20);
    b.write_u32(block + 0x1C, 2);
    b.write_ptr(model + 0x58, block);
    let dict = b.write_dict(&["gsys_material"]);
    b.write_ptr(model + 0x60, dict);
    b.write_u8(model + 0xEF, 1);
    b.write_u32(model + 0xD8, 2);
    b.write_i8(model + 0xF0, 0);

    b.write_i8(model + 0xFF, STAGE_COUNT as i8);
    b.write_i8(model + 0xF9, 0);
    b.write_i8(model + 0xFB, 1);

    // Position index * STAGE_COUNT + base holds element `index` of the stage at `base`.
    let sampler_slots = b.alloc(SAMPLER_NAMES.len() * STAGE_COUNT * 4, 8);
    let block_slots = b.alloc(STAGE_COUNT * 4, 8);
    for base in 0..STAGE_COUNT {
        for index in 0..SAMPLER_NAMES.len() {
            b.write_i32(
                sampler_slots + (index * STAGE_COUNT + base) * 4,
                sampler_slot(index, base),
            );
        }
        b.write_i32(block_slots + base * 4, base as i32);
    }

    let info = b.alloc(0x20, 8);
    let mut sampler_locations = Vec::new();
    for name in SAMPLER_NAMES {
        for prefix in STAGE_PREFIXES {
            sampler_locations.push(format!("{prefix}_{name}"));
        }
    }
    let locations: Vec<&str> = sampler_locations.iter().map(String::as_str).collect();
    let array = b.write_string_array(&locations);
    b.write_ptr(info, array);
    let array = b.write_string_array(&["vs_gsys_material", "fs_gsys_material"]);
    b.write_ptr(info + 0x10, array);
    b.write_ptr(model + 0xA0, info);

    let (container, variations) = build_container(program_count);
    let embedded = b.embed(&container);
    b.write_ptr(model + 0xA8, embedded);

    for (i, variation) in variations.iter().enumerate() {
        let program = programs + i * 0x40;
        b.write_ptr(program, sampler_slots);
        b.write_ptr(program + 0x10, block_slots);
        b.write_ptr(program + 0x20, embedded + variation);
        b.write_u16(program + 0x34, 1);
    }
}

/// A standalone shader container with `variation_count` variations.
pub fn container_file(variation_count: usize) -> Vec<u8> {
    build_container(variation_count).0
}

fn write_code(b: &mut FileBuilder, code: &[u8]) -> usize {
    let record = b.alloc(0x40, 8);
    let data = b.alloc(code.len(), 0x100);
    b.write_bytes(data, code);
    let control = b.alloc(CONTROL_DATA.len(), 8);
    b.write_bytes(control, CONTROL_DATA);
    b.write_ptr(record + 0x8, control);
    b.write_ptr(record + 0x10, data);
    b.write_u32(record + 0x18, code.len() as u32);
    b.write_u32(record + 0x1C, CONTROL_DATA.len() as u32);
    record
}

/// The container bytes and the file offset of each variation record.
fn build_container(variation_count: usize) -> (Vec<u8>, Vec<usize>) {
    let mut b = FileBuilder::new(signature::SHADER_CONTAINER);
    let block = b.alloc(0x30, 8);
    b.write_bytes(block, b"grsc");
    b.set_first_block_offset(block as u16);
    let variations = b.alloc(variation_count.max(1) * 0x40, 8);
    b.write_ptr(block + 0x20, variations);
    b.write_u32(block + 0x1C, variation_count as u32);

    let vertex = write_code(&mut b, VERTEX_CODE);
    let pixel = write_code(&mut b, PIXEL_CODE);

    let interface = b.alloc(0x68, 8);
    let dict = b.write_dict(&SAMPLER_NAMES);
    b.write_ptr(interface + 0x10, dict);
    b.write_i32(interface + 0x2C, 4);
    let slots = b.alloc(8 * 4, 8);
    for slot in 0..8 {
        b.write_i32(slots + slot * 4, slot as i32);
    }
    b.write_ptr(interface + 0x38, slots);
    let table = b.alloc(0x40, 8);
    // pixel stage
    b.write_ptr(table + 4 * 8, interface);

    let mut offsets = Vec::with_capacity(variation_count);
    for i in 0..variation_count {
        let variation = variations + i * 0x40;
        let program = b.alloc(0xA0, 8);
        b.write_ptr(variation + 0x10, program);
        b.write_u8(program, 0);
        b.write_u8(program + 0x1, 0);
        b.write_ptr(program + 0x8, vertex);
        b.write_ptr(program + 0x8 + 4 * 8, pixel);
        b.write_u32(program + 0x60, 0x100);
        b.write_ptr(program + 0x78, table);
        offsets.push(variation);
    }
    (b.finish(), offsets)
}

