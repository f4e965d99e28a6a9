//! Resource bundles (`.bsr`).
//!
//! A fixed header carries eight absolute section offsets. Each section is
//! decoded by seeking to its offset; sections are independent of each other,
//! and the position where one ends is compared against the start of the next
//! only as a consistency check.

mod modifier;

pub use modifier::{
    CurvedKey, GradientKey, MaterialModifier, Modifier, ModifierCommon, ModifierKind,
    ModifierPalette, ModifierSet, PaletteStop, ParticleEmitter, ParticleModifier,
    TextureModifier,
};

use serde::Serialize;

use crate::cursor::ByteReader;
use crate::error::FormatError;
use crate::tag::{BUNDLE_FAMILY, FormatTag};

/// Reserved bytes following the general-info block.
pub const HEADER_RESERVED_LEN: usize = 40;

/// Bundle sections in offset-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SectionKind {
    Materials,
    Meshes,
    Skeleton,
    Animations,
    MeshGroups,
    AnimationGroups,
    ModifierPalette,
    Collision,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Materials,
        SectionKind::Meshes,
        SectionKind::Skeleton,
        SectionKind::Animations,
        SectionKind::MeshGroups,
        SectionKind::AnimationGroups,
        SectionKind::ModifierPalette,
        SectionKind::Collision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Meshes => "meshes",
            Self::Skeleton => "skeleton",
            Self::Animations => "animations",
            Self::MeshGroups => "mesh groups",
            Self::AnimationGroups => "animation groups",
            Self::ModifierPalette => "modifier palette",
            Self::Collision => "collision",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The `type / name / 2×u32` block following the offset table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub resource_type: u32,
    pub name: String,
    pub unknown: [u32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleHeader {
    pub tag: FormatTag,
    /// Section offsets indexed like [`SectionKind::ALL`].
    pub offsets: [u32; 8],
    /// When 1, every mesh entry carries a trailing `u32`.
    pub mesh_extra: u32,
    pub opaque: [u32; 4],
    pub info: ObjectInfo,
    pub reserved: Vec<u8>,
}

impl BundleHeader {
    pub fn offset(&self, kind: SectionKind) -> u32 {
        self.offsets[kind as usize]
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let tag = FormatTag::read(r, BUNDLE_FAMILY)?;
        let mut offsets = [0u32; 8];
        for v in &mut offsets {
            *v = r.read_u32()?;
        }
        let mesh_extra = r.read_u32()?;
        let mut opaque = [0u32; 4];
        for v in &mut opaque {
            *v = r.read_u32()?;
        }
        let info = ObjectInfo {
            resource_type: r.read_u32()?,
            name: r.read_string()?,
            unknown: [r.read_u32()?, r.read_u32()?],
        };
        let reserved = r.read_bytes(HEADER_RESERVED_LEN)?.to_vec();
        Ok(Self {
            tag,
            offsets,
            mesh_extra,
            opaque,
            info,
            reserved,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRef {
    pub id: u32,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshRef {
    pub path: String,
    pub extra: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonRef {
    pub path: String,
    pub attachment_bone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnimationList {
    pub version: u32,
    pub user_define: u32,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshGroup {
    pub name: String,
    pub mesh_indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationEvent {
    pub key_time: u32,
    pub event_type: u32,
    pub unknown: [u32; 2],
}

/// Animation bound to one animation type inside a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationEntry {
    pub animation_type: u32,
    pub file_index: u32,
    pub events: Vec<AnimationEvent>,
    /// Stored as four raw bytes; read as `f32` bit for bit.
    pub walk_length: f32,
    pub walk_points: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationGroup {
    pub name: String,
    pub entries: Vec<AnimationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collision {
    pub mesh_path: String,
    pub box0: [f32; 6],
    pub box1: [f32; 6],
    pub matrix: Option<glam::Mat4>,
}

/// Byte range occupied by a decoded section. `end` is `None` when decoding
/// stopped before the section was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionSpan {
    pub kind: SectionKind,
    pub start: usize,
    pub end: Option<usize>,
    /// The offset pointed at the end of the buffer.
    pub absent: bool,
}

/// Non-fatal findings recorded while decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BundleWarning {
    SectionMismatch {
        kind: SectionKind,
        end: usize,
        next: SectionKind,
        next_start: usize,
    },
    PaletteStopped(PaletteStop),
    CollisionUndecoded(String),
}

impl std::fmt::Display for BundleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SectionMismatch {
                kind,
                end,
                next,
                next_start,
            } => write!(
                f,
                "{kind} ends at {end} but {next} starts at {next_start}"
            ),
            Self::PaletteStopped(stop) => write!(
                f,
                "modifier palette stopped at offset {} on tag {:#x} in set {}",
                stop.offset, stop.tag, stop.set_index
            ),
            Self::CollisionUndecoded(e) => write!(f, "collision section undecoded: {e}"),
        }
    }
}

/// A decoded resource bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceBundle {
    pub header: BundleHeader,
    pub materials: Vec<MaterialRef>,
    pub meshes: Vec<MeshRef>,
    pub skeleton: Option<SkeletonRef>,
    pub animations: AnimationList,
    pub mesh_groups: Vec<MeshGroup>,
    pub animation_groups: Vec<AnimationGroup>,
    pub palette: ModifierPalette,
    pub collision: Option<Collision>,
    pub spans: Vec<SectionSpan>,
    pub warnings: Vec<BundleWarning>,
    #[serde(skip)]
    initialized: bool,
}

impl ResourceBundle {
    pub fn try_decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut r = ByteReader::new(bytes);
        let header = BundleHeader::read(&mut r)?;
        let mut spans = Vec::with_capacity(SectionKind::ALL.len());

        let materials = section(&mut r, &header, SectionKind::Materials, &mut spans, |r| {
            let count = r.read_count(8)?;
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(MaterialRef {
                    id: r.read_u32()?,
                    path: r.read_string()?,
                });
            }
            Ok(out)
        })?
        .unwrap_or_default();

        let meshes = section(&mut r, &header, SectionKind::Meshes, &mut spans, |r| {
            let count = r.read_count(4)?;
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let path = r.read_string()?;
                let extra = if header.mesh_extra == 1 {
                    Some(r.read_u32()?)
                } else {
                    None
                };
                out.push(MeshRef { path, extra });
            }
            Ok(out)
        })?
        .unwrap_or_default();

        let skeleton = section(&mut r, &header, SectionKind::Skeleton, &mut spans, |r| {
            if r.read_u32()? != 1 {
                return Ok(None);
            }
            Ok(Some(SkeletonRef {
                path: r.read_string()?,
                attachment_bone: r.read_string()?,
            }))
        })?
        .flatten();

        let animations = section(&mut r, &header, SectionKind::Animations, &mut spans, |r| {
            let version = r.read_u32()?;
            let user_define = r.read_u32()?;
            let count = r.read_count(4)?;
            let mut paths = Vec::with_capacity(count);
            for _ in 0..count {
                paths.push(r.read_string()?);
            }
            Ok(AnimationList {
                version,
                user_define,
                paths,
            })
        })?
        .unwrap_or_default();

        let mesh_groups = section(&mut r, &header, SectionKind::MeshGroups, &mut spans, |r| {
            let count = r.read_count(8)?;
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let name = r.read_string()?;
                let n = r.read_count(4)?;
                let mut mesh_indices = Vec::with_capacity(n);
                for _ in 0..n {
                    mesh_indices.push(r.read_u32()?);
                }
                out.push(MeshGroup { name, mesh_indices });
            }
            Ok(out)
        })?
        .unwrap_or_default();

        let animation_groups = section(
            &mut r,
            &header,
            SectionKind::AnimationGroups,
            &mut spans,
            read_animation_groups,
        )?
        .unwrap_or_default();

        let palette = section(
            &mut r,
            &header,
            SectionKind::ModifierPalette,
            &mut spans,
            ModifierPalette::read,
        )?
        .unwrap_or_default();

        let mut warnings = Vec::new();
        if let Some(stop) = palette.stop {
            // The palette's true end is unknown past an unhandled record.
            if let Some(span) = spans
                .iter_mut()
                .find(|s| s.kind == SectionKind::ModifierPalette)
            {
                span.end = None;
            }
            warnings.push(BundleWarning::PaletteStopped(stop));
        }

        // Collision failures are reported but never fail the bundle.
        let collision = match section(
            &mut r,
            &header,
            SectionKind::Collision,
            &mut spans,
            read_collision,
        ) {
            Ok(collision) => collision,
            Err(e @ FormatError::UnresolvedSectionOffset { .. }) => return Err(e),
            Err(e) => {
                spans.push(SectionSpan {
                    kind: SectionKind::Collision,
                    start: header.offset(SectionKind::Collision) as usize,
                    end: None,
                    absent: false,
                });
                warnings.push(BundleWarning::CollisionUndecoded(e.to_string()));
                None
            }
        };

        warnings.extend(check_spans(&spans));
        for warning in &warnings {
            tracing::warn!(name = %header.info.name, "{warning}");
        }

        Ok(Self {
            header,
            materials,
            meshes,
            skeleton,
            animations,
            mesh_groups,
            animation_groups,
            palette,
            collision,
            spans,
            warnings,
            initialized: true,
        })
    }

    /// Decode, converting any failure into an uninitialized bundle.
    pub fn decode(bytes: &[u8]) -> Self {
        match Self::try_decode(bytes) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(error = %e, "resource bundle failed to decode");
                Self::uninitialized()
            }
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            header: BundleHeader {
                tag: FormatTag::BUNDLE,
                offsets: [0; 8],
                mesh_extra: 0,
                opaque: [0; 4],
                info: ObjectInfo::default(),
                reserved: Vec::new(),
            },
            materials: Vec::new(),
            meshes: Vec::new(),
            skeleton: None,
            animations: AnimationList::default(),
            mesh_groups: Vec::new(),
            animation_groups: Vec::new(),
            palette: ModifierPalette::default(),
            collision: None,
            spans: Vec::new(),
            warnings: Vec::new(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn name(&self) -> &str {
        &self.header.info.name
    }

    pub fn span(&self, kind: SectionKind) -> Option<&SectionSpan> {
        self.spans.iter().find(|s| s.kind == kind)
    }
}

/// Seek to a section and decode it. Returns `Ok(None)` when the offset
/// equals the buffer length, which marks the section as absent.
fn section<'a, T>(
    r: &mut ByteReader<'a>,
    header: &BundleHeader,
    kind: SectionKind,
    spans: &mut Vec<SectionSpan>,
    decode: impl FnOnce(&mut ByteReader<'a>) -> Result<T, FormatError>,
) -> Result<Option<T>, FormatError> {
    let start = header.offset(kind) as usize;
    r.seek(start)?;
    if r.is_at_end() {
        spans.push(SectionSpan {
            kind,
            start,
            end: Some(start),
            absent: true,
        });
        return Ok(None);
    }
    let value = decode(r)?;
    spans.push(SectionSpan {
        kind,
        start,
        end: Some(r.position()),
        absent: false,
    });
    Ok(Some(value))
}

fn read_animation_groups(r: &mut ByteReader<'_>) -> Result<Vec<AnimationGroup>, FormatError> {
    let count = r.read_count(8)?;
    let mut groups = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.read_string()?;
        let n = r.read_count(20)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            let animation_type = r.read_u32()?;
            let file_index = r.read_u32()?;
            let event_count = r.read_count(16)?;
            let mut events = Vec::with_capacity(event_count);
            for _ in 0..event_count {
                events.push(AnimationEvent {
                    key_time: r.read_u32()?,
                    event_type: r.read_u32()?,
                    unknown: [r.read_u32()?, r.read_u32()?],
                });
            }
            let point_count = r.read_u32()? as usize;
            let walk_length = r.read_f32()?;
            if point_count.saturating_mul(8) > r.remaining() {
                return Err(FormatError::UnexpectedEof {
                    offset: r.position(),
                    wanted: point_count.saturating_mul(8),
                    available: r.remaining(),
                });
            }
            let mut walk_points = Vec::with_capacity(point_count);
            for _ in 0..point_count {
                walk_points.push([r.read_f32()?, r.read_f32()?]);
            }
            entries.push(AnimationEntry {
                animation_type,
                file_index,
                events,
                walk_length,
                walk_points,
            });
        }
        groups.push(AnimationGroup { name, entries });
    }
    Ok(groups)
}

fn read_collision(r: &mut ByteReader<'_>) -> Result<Collision, FormatError> {
    let mesh_path = r.read_string()?;
    let mut box0 = [0f32; 6];
    for v in &mut box0 {
        *v = r.read_f32()?;
    }
    let mut box1 = [0f32; 6];
    for v in &mut box1 {
        *v = r.read_f32()?;
    }
    let matrix = if r.read_u32()? != 0 {
        let mut cols = [0f32; 16];
        for v in &mut cols {
            *v = r.read_f32()?;
        }
        Some(glam::Mat4::from_cols_array(&cols))
    } else {
        None
    };
    Ok(Collision {
        mesh_path,
        box0,
        box1,
        matrix,
    })
}

/// Compare each present section's end with the start of the next one in
/// file order.
fn check_spans(spans: &[SectionSpan]) -> Vec<BundleWarning> {
    let mut present: Vec<&SectionSpan> = spans.iter().filter(|s| !s.absent).collect();
    present.sort_by_key(|s| (s.start, s.kind));
    present
        .windows(2)
        .filter_map(|pair| {
            let (cur, next) = (pair[0], pair[1]);
            let end = cur.end?;
            (end != next.start).then_some(BundleWarning::SectionMismatch {
                kind: cur.kind,
                end,
                next: next.kind,
                next_start: next.start,
            })
        })
        .collect()
}
