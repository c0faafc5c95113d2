// Material module - Textures, palettes and the materials that share them
//
// A material aggregates at most one texture handle and one palette
// reference. Handles bind to exactly one allocation record in the vram
// pools; cloning a material adds references to the same records instead
// of re-uploading, so many logical materials can share one physical
// upload. Deleting a material releases its references and the records
// are only freed once the last reference is gone.

#[cfg(test)]
mod tests;

use crate::vram::{Pool, RecordId, VramBanks, VramError, PALETTE_BANK_SIZE};

/// Byte alignment of texture base addresses
const TEXTURE_ALIGN: usize = 8;

/// Byte alignment of palette base addresses
const PALETTE_ALIGN: usize = 16;

/// Texel formats understood by the fixed-function pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 4-color paletted, 2 bits per texel
    Pal4,
    /// 16-color paletted, 4 bits per texel
    Pal16,
    /// 256-color paletted, 8 bits per texel
    Pal256,
    /// 32-color paletted with 3-bit alpha, 8 bits per texel
    A3Pal32,
    /// 8-color paletted with 5-bit alpha, 8 bits per texel
    A5Pal8,
    /// Direct 16-bit color, no palette
    Direct,
}

impl TextureFormat {
    /// Bits each texel occupies in video memory
    pub fn bits_per_texel(self) -> usize {
        match self {
            TextureFormat::Pal4 => 2,
            TextureFormat::Pal16 => 4,
            TextureFormat::Pal256 | TextureFormat::A3Pal32 | TextureFormat::A5Pal8 => 8,
            TextureFormat::Direct => 16,
        }
    }

    /// Number of palette entries the format expects, if paletted
    pub fn palette_entries(self) -> Option<usize> {
        match self {
            TextureFormat::Pal4 => Some(4),
            TextureFormat::Pal16 => Some(16),
            TextureFormat::Pal256 => Some(256),
            TextureFormat::A3Pal32 => Some(32),
            TextureFormat::A5Pal8 => Some(8),
            TextureFormat::Direct => None,
        }
    }

    /// Size in bytes of a `width` x `height` texture in this format
    pub fn texture_bytes(self, width: u16, height: u16) -> usize {
        (width as usize * height as usize * self.bits_per_texel()) / 8
    }
}

/// A texture bound to one allocation record
#[derive(Debug)]
struct TextureBinding {
    record: RecordId,
    width: u16,
    height: u16,
    format: TextureFormat,
}

/// A caller-owned palette object
///
/// Starts unbound; binds to a record on load. The object owns one
/// reference to its record.
#[derive(Debug, Default)]
pub struct Palette {
    record: Option<RecordId>,
}

impl Palette {
    /// Create an unbound palette
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the palette is bound to video memory
    pub fn is_loaded(&self) -> bool {
        self.record.is_some()
    }
}

/// A logical material aggregating a texture and a palette reference
#[derive(Debug, Default)]
pub struct Material {
    texture: Option<TextureBinding>,
    palette: Option<RecordId>,
}

impl Material {
    /// Create an empty material
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a texture is bound
    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Whether a palette reference is held
    pub fn has_palette(&self) -> bool {
        self.palette.is_some()
    }

    /// Texture dimensions, if a texture is bound
    pub fn texture_size(&self) -> Option<(u16, u16)> {
        self.texture.as_ref().map(|t| (t.width, t.height))
    }

    /// Texture format, if a texture is bound
    pub fn texture_format(&self) -> Option<TextureFormat> {
        self.texture.as_ref().map(|t| t.format)
    }
}

/// Default material lighting properties programmed at engine init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialProps {
    /// Ambient reflection color (RGB15)
    pub ambient: u16,
    /// Diffuse reflection color (RGB15)
    pub diffuse: u16,
    /// Specular reflection color (RGB15)
    pub specular: u16,
    /// Emission color (RGB15)
    pub emission: u16,
}

/// Pack 5-bit color components into RGB15
pub fn rgb15(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16) & 0x1F) | (((g as u16) & 0x1F) << 5) | (((b as u16) & 0x1F) << 10)
}

impl Default for MaterialProps {
    fn default() -> Self {
        Self {
            diffuse: rgb15(20, 20, 20),
            ambient: rgb15(16, 16, 16),
            specular: rgb15(8, 8, 8),
            emission: rgb15(5, 5, 5),
        }
    }
}

/// Owner of the texture and palette pools
///
/// Every texture/palette lifecycle operation goes through this system so
/// the pools remain the single source of truth for liveness.
pub struct MaterialSystem {
    textures: Pool,
    palettes: Pool,
    banks: VramBanks,
}

impl MaterialSystem {
    /// Create the pools over the selected texture banks
    ///
    /// The palette pool always lives in the dedicated palette bank. Fails
    /// with `InvalidConfig` if no texture bank is selected.
    pub fn new(banks: VramBanks) -> Result<Self, VramError> {
        if banks.count() == 0 {
            return Err(VramError::InvalidConfig(
                "no texture banks selected".into(),
            ));
        }
        Ok(Self {
            textures: Pool::new(banks.capacity())?,
            palettes: Pool::new(PALETTE_BANK_SIZE)?,
            banks,
        })
    }

    /// Discard all records and reinitialize over a new bank selection
    pub fn reset(&mut self, banks: VramBanks) -> Result<(), VramError> {
        *self = MaterialSystem::new(banks)?;
        Ok(())
    }

    /// Banks currently granted to the texture pool
    pub fn banks(&self) -> VramBanks {
        self.banks
    }

    /// Free texture memory in bytes
    pub fn texture_free_bytes(&self) -> usize {
        self.textures.free_bytes()
    }

    /// Used texture memory in bytes
    pub fn texture_used_bytes(&self) -> usize {
        self.textures.used_bytes()
    }

    /// Free palette memory in bytes
    pub fn palette_free_bytes(&self) -> usize {
        self.palettes.free_bytes()
    }

    /// Used palette memory in bytes
    pub fn palette_used_bytes(&self) -> usize {
        self.palettes.used_bytes()
    }

    /// Load texel data into a material
    ///
    /// Always allocates a fresh record; content is never deduplicated
    /// against existing uploads (sharing happens only through
    /// [`MaterialSystem::clone_material`]). A material that already holds
    /// a texture releases it first. On allocation failure the material
    /// keeps its previous binding only if it had none to release.
    pub fn load_texture(
        &mut self,
        material: &mut Material,
        format: TextureFormat,
        width: u16,
        height: u16,
        data: &[u8],
    ) -> Result<(), VramError> {
        if width == 0 || height == 0 {
            return Err(VramError::InvalidConfig(
                "texture dimensions must be non-zero".into(),
            ));
        }

        let size = format.texture_bytes(width, height);
        if data.len() > size {
            return Err(VramError::InvalidConfig(format!(
                "texel data is {} bytes but the texture holds {}",
                data.len(),
                size
            )));
        }

        if let Some(old) = material.texture.take() {
            self.textures.release(old.record)?;
        }

        let record = self.textures.allocate(size, TEXTURE_ALIGN)?;
        self.textures.upload(record, data)?;
        material.texture = Some(TextureBinding {
            record,
            width,
            height,
            format,
        });
        Ok(())
    }

    /// Load palette colors into a palette object
    ///
    /// The entry count must match what `format` expects. A bound palette
    /// releases its old record first.
    pub fn load_palette(
        &mut self,
        palette: &mut Palette,
        colors: &[u16],
        format: TextureFormat,
    ) -> Result<(), VramError> {
        let entries = format.palette_entries().ok_or_else(|| {
            VramError::InvalidConfig("direct-color textures take no palette".into())
        })?;
        if colors.len() != entries {
            return Err(VramError::InvalidConfig(format!(
                "{} palette colors supplied, format expects {}",
                colors.len(),
                entries
            )));
        }

        if let Some(old) = palette.record.take() {
            self.palettes.release(old)?;
        }

        let record = self.palettes.allocate(entries * 2, PALETTE_ALIGN)?;
        let mut bytes = Vec::with_capacity(entries * 2);
        for color in colors {
            bytes.extend_from_slice(&color.to_le_bytes());
        }
        self.palettes.upload(record, &bytes)?;
        palette.record = Some(record);
        Ok(())
    }

    /// Attach a palette to a material
    ///
    /// The material takes its own reference to the palette's record, so
    /// the colors stay resident even if the palette object is deleted
    /// while clones of the material are alive.
    pub fn set_material_palette(
        &mut self,
        material: &mut Material,
        palette: &Palette,
    ) -> Result<(), VramError> {
        let record = palette.record.ok_or_else(|| {
            VramError::InvalidConfig("palette is not loaded".into())
        })?;

        if let Some(old) = material.palette.take() {
            self.palettes.release(old)?;
        }
        material.palette = Some(self.palettes.clone_record(record)?);
        Ok(())
    }

    /// Clone a material
    ///
    /// The clone references the same texture and palette records; both
    /// records' reference counts go up by one and nothing is copied.
    pub fn clone_material(&mut self, source: &Material) -> Result<Material, VramError> {
        let texture = match &source.texture {
            Some(binding) => Some(TextureBinding {
                record: self.textures.clone_record(binding.record)?,
                width: binding.width,
                height: binding.height,
                format: binding.format,
            }),
            None => None,
        };
        let palette = match source.palette {
            Some(record) => Some(self.palettes.clone_record(record)?),
            None => None,
        };
        Ok(Material { texture, palette })
    }

    /// Delete a material, releasing its references
    ///
    /// The underlying memory is freed only when this was the last
    /// reference to a record; it never moves either way.
    pub fn delete_material(&mut self, material: Material) -> Result<(), VramError> {
        if let Some(binding) = material.texture {
            self.textures.release(binding.record)?;
        }
        if let Some(record) = material.palette {
            self.palettes.release(record)?;
        }
        Ok(())
    }

    /// Delete a palette object, releasing its reference
    pub fn delete_palette(&mut self, palette: Palette) -> Result<(), VramError> {
        if let Some(record) = palette.record {
            self.palettes.release(record)?;
        }
        Ok(())
    }
}
