//! The modifier palette: named sets of tag-dispatched modifier records.
//!
//! Only four record shapes are understood. Records carry no length, so the
//! first tag outside that set ends palette decoding; everything read before
//! it is kept.

use glam::Vec3;
use serde::Serialize;

use crate::cursor::ByteReader;
use crate::error::FormatError;

/// Modifier tags seen in shipped bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModifierKind {
    Material,
    TextureAnimation,
    MultiTexture,
    MultiTextureReverse,
    Particle,
    EnvironmentMap,
    BumpEnvironment,
    Sound,
    DynamicVertex,
    DynamicJoint,
    DynamicLattice,
    EquipmentPower,
}

impl ModifierKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0x0001_0000 => Self::Material,
            0x0001_0001 => Self::TextureAnimation,
            0x0001_0002 => Self::MultiTexture,
            0x0001_0003 => Self::MultiTextureReverse,
            0x0001_0004 => Self::Particle,
            0x0001_0005 => Self::EnvironmentMap,
            0x0001_0006 => Self::BumpEnvironment,
            0x0001_0007 => Self::Sound,
            0x0002_0000 => Self::DynamicVertex,
            0x0002_0001 => Self::DynamicJoint,
            0x0002_0002 => Self::DynamicLattice,
            0x0003_0000 => Self::EquipmentPower,
            _ => return None,
        })
    }

    pub fn tag(self) -> u32 {
        match self {
            Self::Material => 0x0001_0000,
            Self::TextureAnimation => 0x0001_0001,
            Self::MultiTexture => 0x0001_0002,
            Self::MultiTextureReverse => 0x0001_0003,
            Self::Particle => 0x0001_0004,
            Self::EnvironmentMap => 0x0001_0005,
            Self::BumpEnvironment => 0x0001_0006,
            Self::Sound => 0x0001_0007,
            Self::DynamicVertex => 0x0002_0000,
            Self::DynamicJoint => 0x0002_0001,
            Self::DynamicLattice => 0x0002_0002,
            Self::EquipmentPower => 0x0003_0000,
        }
    }

    /// Whether a record decoder exists for this tag.
    pub fn is_decodable(self) -> bool {
        matches!(
            self,
            Self::Material | Self::MultiTexture | Self::MultiTextureReverse | Self::Particle
        )
    }
}

/// Fields shared by every modifier record. Meaning not recovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModifierCommon {
    pub float0: f32,
    pub ints: [i32; 5],
    pub bytes: [u8; 4],
}

impl ModifierCommon {
    fn read(r: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let float0 = r.read_f32()?;
        let mut ints = [0i32; 5];
        for v in &mut ints {
            *v = r.read_i32()?;
        }
        Ok(Self {
            float0,
            ints,
            bytes: r.read_array()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientKey {
    pub time: u32,
    pub values: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvedKey {
    pub time: u32,
    pub value: f32,
}

/// Value of `head[1]` that introduces a curved-key list.
const CURVED_KEYS_PRESENT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialModifier {
    pub common: ModifierCommon,
    pub head: [u32; 3],
    pub gradient_keys: Vec<GradientKey>,
    pub curved_keys: Option<Vec<CurvedKey>>,
    pub tail: [u32; 9],
}

impl MaterialModifier {
    fn read(r: &mut ByteReader<'_>, common: ModifierCommon) -> Result<Self, FormatError> {
        let mut head = [0u32; 3];
        for v in &mut head {
            *v = r.read_u32()?;
        }

        let count = r.read_count(20)?;
        let mut gradient_keys = Vec::with_capacity(count);
        for _ in 0..count {
            let time = r.read_u32()?;
            let mut values = [0f32; 4];
            for v in &mut values {
                *v = r.read_f32()?;
            }
            gradient_keys.push(GradientKey { time, values });
        }

        let curved_keys = if head[1] == CURVED_KEYS_PRESENT {
            let count = r.read_count(8)?;
            let mut keys = Vec::with_capacity(count);
            for _ in 0..count {
                keys.push(CurvedKey {
                    time: r.read_u32()?,
                    value: r.read_f32()?,
                });
            }
            Some(keys)
        } else {
            None
        };

        let mut tail = [0u32; 9];
        for v in &mut tail {
            *v = r.read_u32()?;
        }

        Ok(Self {
            common,
            head,
            gradient_keys,
            curved_keys,
            tail,
        })
    }
}

/// Shape shared by the multi-texture and multi-texture-reverse records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureModifier {
    pub common: ModifierCommon,
    pub unknown0: u32,
    pub texture: String,
    pub unknown1: u32,
}

impl TextureModifier {
    fn read(r: &mut ByteReader<'_>, common: ModifierCommon) -> Result<Self, FormatError> {
        Ok(Self {
            common,
            unknown0: r.read_u32()?,
            texture: r.read_string()?,
            unknown1: r.read_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleEmitter {
    pub enabled: u32,
    pub file_name: String,
    pub bone: String,
    pub bone_position: Vec3,
    pub birth_time: u32,
    pub flags: [u8; 4],
    /// Present when `flags[3] == 1`.
    pub extra: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleModifier {
    pub common: ModifierCommon,
    pub emitters: Vec<ParticleEmitter>,
}

impl ParticleModifier {
    fn read(r: &mut ByteReader<'_>, common: ModifierCommon) -> Result<Self, FormatError> {
        let count = r.read_count(4 + 4 + 4 + 12 + 4 + 4)?;
        let mut emitters = Vec::with_capacity(count);
        for _ in 0..count {
            let enabled = r.read_u32()?;
            let file_name = r.read_string()?;
            let bone = r.read_string()?;
            let bone_position = r.read_vec3()?;
            let birth_time = r.read_u32()?;
            let flags: [u8; 4] = r.read_array()?;
            let extra = if flags[3] == 1 {
                Some(r.read_vec3()?)
            } else {
                None
            };
            emitters.push(ParticleEmitter {
                enabled,
                file_name,
                bone,
                bone_position,
                birth_time,
                flags,
                extra,
            });
        }
        Ok(Self { common, emitters })
    }
}

/// One modifier record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Modifier {
    Material(MaterialModifier),
    MultiTexture(TextureModifier),
    MultiTextureReverse(TextureModifier),
    Particle(ParticleModifier),
    /// A tag with no recoverable record length; decoding stopped here.
    Unknown(u32),
}

impl Modifier {
    pub fn kind(&self) -> Option<ModifierKind> {
        match self {
            Self::Material(_) => Some(ModifierKind::Material),
            Self::MultiTexture(_) => Some(ModifierKind::MultiTexture),
            Self::MultiTextureReverse(_) => Some(ModifierKind::MultiTextureReverse),
            Self::Particle(_) => Some(ModifierKind::Particle),
            Self::Unknown(tag) => ModifierKind::from_tag(*tag),
        }
    }
}

/// A named modifier set bound to an animation type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModifierSet {
    pub set_type: u32,
    pub animation_type: u32,
    pub name: String,
    /// Modifier count declared in the file; may exceed `modifiers.len()`
    /// when decoding stopped inside this set.
    pub declared_count: u32,
    pub modifiers: Vec<Modifier>,
}

/// Where and why palette decoding stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaletteStop {
    /// Offset of the unrecognized tag.
    pub offset: usize,
    pub tag: u32,
    pub set_index: usize,
    pub kind: Option<ModifierKind>,
}

impl PaletteStop {
    pub fn to_error(self) -> FormatError {
        FormatError::UnknownVariantTag {
            tag: self.tag,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModifierPalette {
    pub declared_sets: u32,
    pub sets: Vec<ModifierSet>,
    /// Set when the rest of the section was left undecoded.
    pub stop: Option<PaletteStop>,
}

impl ModifierPalette {
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }

    pub fn modifier_count(&self) -> usize {
        self.sets.iter().map(|s| s.modifiers.len()).sum()
    }

    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let declared_sets = r.read_u32()?;
        let mut palette = Self {
            declared_sets,
            ..Self::default()
        };

        for set_index in 0..declared_sets as usize {
            let mut set = ModifierSet {
                set_type: r.read_u32()?,
                animation_type: r.read_u32()?,
                name: r.read_string()?,
                declared_count: r.read_u32()?,
                modifiers: Vec::new(),
            };

            for _ in 0..set.declared_count {
                let offset = r.position();
                let tag = r.read_u32()?;
                let kind = ModifierKind::from_tag(tag);
                let modifier = match kind {
                    Some(ModifierKind::Material) => {
                        let common = ModifierCommon::read(r)?;
                        Modifier::Material(MaterialModifier::read(r, common)?)
                    }
                    Some(ModifierKind::MultiTexture) => {
                        let common = ModifierCommon::read(r)?;
                        Modifier::MultiTexture(TextureModifier::read(r, common)?)
                    }
                    Some(ModifierKind::MultiTextureReverse) => {
                        let common = ModifierCommon::read(r)?;
                        Modifier::MultiTextureReverse(TextureModifier::read(r, common)?)
                    }
                    Some(ModifierKind::Particle) => {
                        let common = ModifierCommon::read(r)?;
                        Modifier::Particle(ParticleModifier::read(r, common)?)
                    }
                    _ => {
                        set.modifiers.push(Modifier::Unknown(tag));
                        palette.sets.push(set);
                        palette.stop = Some(PaletteStop {
                            offset,
                            tag,
                            set_index,
                            kind,
                        });
                        return Ok(palette);
                    }
                };
                set.modifiers.push(modifier);
            }

            palette.sets.push(set);
        }

        Ok(palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteWriter;

    fn write_common(w: &mut ByteWriter) {
        w.write_f32(0.25);
        for i in 0..5 {
            w.write_i32(i);
        }
        w.write_bytes(&[1, 2, 3, 4]);
    }

    fn write_set_header(w: &mut ByteWriter, name: &str, count: u32) {
        w.write_u32(1).write_u32(0x07).write_string(name).write_u32(count);
    }

    #[test]
    fn tag_table_round_trips() {
        for tag in [0x1_0000, 0x1_0003, 0x1_0007, 0x2_0002, 0x3_0000] {
            let kind = ModifierKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert!(ModifierKind::from_tag(0xdead).is_none());
        assert!(ModifierKind::Particle.is_decodable());
        assert!(!ModifierKind::Sound.is_decodable());
    }

    #[test]
    fn decodes_material_with_curved_keys() {
        let mut w = ByteWriter::new();
        w.write_u32(1);
        write_set_header(&mut w, "glow", 1);
        w.write_u32(ModifierKind::Material.tag());
        write_common(&mut w);
        w.write_u32(10).write_u32(CURVED_KEYS_PRESENT).write_u32(30);
        w.write_u32(2);
        for t in 0..2 {
            w.write_u32(t * 100);
            for c in 0..4 {
                w.write_f32(c as f32);
            }
        }
        w.write_u32(1).write_u32(50).write_f32(0.5);
        for i in 0..9 {
            w.write_u32(i);
        }
        let bytes = w.into_inner();

        let mut r = ByteReader::new(&bytes);
        let palette = ModifierPalette::read(&mut r).unwrap();
        assert!(palette.is_complete());
        assert!(r.is_at_end());
        let Modifier::Material(m) = &palette.sets[0].modifiers[0] else {
            panic!("expected material modifier");
        };
        assert_eq!(m.common.ints, [0, 1, 2, 3, 4]);
        assert_eq!(m.gradient_keys.len(), 2);
        assert_eq!(m.gradient_keys[1].time, 100);
        assert_eq!(m.curved_keys.as_deref(), Some(&[CurvedKey { time: 50, value: 0.5 }][..]));
        assert_eq!(m.tail[8], 8);
    }

    #[test]
    fn material_without_curved_keys() {
        let mut w = ByteWriter::new();
        w.write_u32(1);
        write_set_header(&mut w, "plain", 1);
        w.write_u32(ModifierKind::Material.tag());
        write_common(&mut w);
        w.write_u32(0).write_u32(1).write_u32(0).write_u32(0);
        for _ in 0..9 {
            w.write_u32(0);
        }
        let bytes = w.into_inner();

        let palette = ModifierPalette::read(&mut ByteReader::new(&bytes)).unwrap();
        let Modifier::Material(m) = &palette.sets[0].modifiers[0] else {
            panic!("expected material modifier");
        };
        assert!(m.curved_keys.is_none());
    }

    #[test]
    fn decodes_texture_and_particle_records() {
        let mut w = ByteWriter::new();
        w.write_u32(1);
        write_set_header(&mut w, "fx", 3);

        w.write_u32(ModifierKind::MultiTexture.tag());
        write_common(&mut w);
        w.write_u32(1).write_string("tex\\a.ddj").write_u32(2);

        w.write_u32(ModifierKind::MultiTextureReverse.tag());
        write_common(&mut w);
        w.write_u32(3).write_string("tex\\b.ddj").write_u32(4);

        w.write_u32(ModifierKind::Particle.tag());
        write_common(&mut w);
        w.write_u32(2);
        // first emitter carries the extra vector
        w.write_u32(1)
            .write_string("fire.efp")
            .write_string("Bip01 R Hand")
            .write_vec3(Vec3::new(1.0, 2.0, 3.0))
            .write_u32(40)
            .write_bytes(&[0, 0, 0, 1])
            .write_vec3(Vec3::Y);
        w.write_u32(0)
            .write_string("smoke.efp")
            .write_string("")
            .write_vec3(Vec3::ZERO)
            .write_u32(0)
            .write_bytes(&[0, 0, 0, 0]);
        let bytes = w.into_inner();

        let mut r = ByteReader::new(&bytes);
        let palette = ModifierPalette::read(&mut r).unwrap();
        assert!(r.is_at_end());
        let mods = &palette.sets[0].modifiers;
        assert_eq!(mods.len(), 3);
        assert!(matches!(&mods[0], Modifier::MultiTexture(t) if t.texture == "tex\\a.ddj"));
        assert!(matches!(&mods[1], Modifier::MultiTextureReverse(t) if t.unknown1 == 4));
        let Modifier::Particle(p) = &mods[2] else {
            panic!("expected particle modifier");
        };
        assert_eq!(p.emitters.len(), 2);
        assert_eq!(p.emitters[0].extra, Some(Vec3::Y));
        assert_eq!(p.emitters[0].bone, "Bip01 R Hand");
        assert_eq!(p.emitters[1].extra, None);
    }

    #[test]
    fn unhandled_tag_stops_but_keeps_earlier_sets() {
        let mut w = ByteWriter::new();
        w.write_u32(3);
        write_set_header(&mut w, "first", 1);
        w.write_u32(ModifierKind::MultiTexture.tag());
        write_common(&mut w);
        w.write_u32(0).write_string("t.ddj").write_u32(0);

        write_set_header(&mut w, "second", 2);
        let stop_offset = w.position();
        w.write_u32(ModifierKind::Sound.tag());
        w.write_bytes(&[0xaa; 32]);
        let bytes = w.into_inner();

        let palette = ModifierPalette::read(&mut ByteReader::new(&bytes)).unwrap();
        assert!(!palette.is_complete());
        assert_eq!(palette.sets.len(), 2);
        assert_eq!(palette.sets[0].modifiers.len(), 1);
        assert_eq!(palette.sets[1].modifiers, vec![Modifier::Unknown(0x1_0007)]);
        let stop = palette.stop.unwrap();
        assert_eq!(stop.offset, stop_offset);
        assert_eq!(stop.set_index, 1);
        assert_eq!(stop.kind, Some(ModifierKind::Sound));
        assert!(matches!(
            stop.to_error(),
            FormatError::UnknownVariantTag { tag: 0x1_0007, .. }
        ));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut w = ByteWriter::new();
        w.write_u32(1);
        write_set_header(&mut w, "cut", 1);
        w.write_u32(ModifierKind::MultiTexture.tag());
        w.write_f32(1.0);
        let bytes = w.into_inner();
        assert!(ModifierPalette::read(&mut ByteReader::new(&bytes)).is_err());
    }
}
