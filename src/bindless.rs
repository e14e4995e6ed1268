//! Bindless texture slots
//!
//! All materials share one region of a shader-visible descriptor heap. The
//! region starts at a fixed base register; constant buffers store indices
//! relative to it. Relative index 0 is the default 2D texture and index 1
//! the default cube texture.
//!
//! Freed slots are reusable immediately. Callers must make sure no in-flight
//! command list still reads a descriptor before freeing its slot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::backend::{
    CommandContext, DescriptorHeap, GraphicsDevice, TextureDimension, TextureHandle, TextureLoader,
};
use crate::error::Result;
use crate::resources::TextureData;

/// Bitmap allocator over `[base, base + capacity)`.
#[derive(Debug, Clone)]
pub struct BindlessAllocator {
    bits: Vec<u64>,
    capacity: u32,
    base: u32,
    cursor: u32,
    allocated: u32,
}

impl BindlessAllocator {
    pub fn new(capacity: u32, base: u32) -> Self {
        Self {
            bits: vec![0; capacity.div_ceil(64) as usize],
            capacity,
            base,
            cursor: 0,
            allocated: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn base_register(&self) -> u32 {
        self.base
    }

    pub fn allocated_count(&self) -> u32 {
        self.allocated
    }

    /// Raw bitmap words, bit `i` set when relative slot `i` is used.
    pub fn bitmap(&self) -> &[u64] {
        &self.bits
    }

    /// Allocate a slot and return its absolute index, or `None` when every
    /// slot is in use. Scanning starts at the cursor and wraps.
    pub fn allocate(&mut self) -> Option<u32> {
        if self.allocated == self.capacity {
            return None;
        }
        for step in 0..self.capacity {
            let slot = (self.cursor + step) % self.capacity;
            if !self.test(slot) {
                self.bits[(slot / 64) as usize] |= 1 << (slot % 64);
                self.allocated += 1;
                self.cursor = (slot + 1) % self.capacity;
                return Some(self.base + slot);
            }
        }
        None
    }

    /// Release an absolute index. Returns `false` if it was not allocated.
    pub fn free(&mut self, absolute: u32) -> bool {
        let Some(slot) = self.relative(absolute) else {
            log::warn!("bindless free of out-of-range index {absolute}");
            return false;
        };
        if !self.test(slot) {
            log::warn!("bindless double free of index {absolute}");
            return false;
        }
        self.bits[(slot / 64) as usize] &= !(1 << (slot % 64));
        self.allocated -= 1;
        true
    }

    pub fn is_allocated(&self, absolute: u32) -> bool {
        self.relative(absolute).is_some_and(|slot| self.test(slot))
    }

    /// Index relative to the base register, as stored in constant buffers.
    pub fn relative(&self, absolute: u32) -> Option<u32> {
        absolute
            .checked_sub(self.base)
            .filter(|&slot| slot < self.capacity)
    }

    fn test(&self, slot: u32) -> bool {
        self.bits[(slot / 64) as usize] & (1 << (slot % 64)) != 0
    }
}

/// Slots reserved for default textures, in allocation order.
const DEFAULT_DIMENSIONS: [TextureDimension; 2] = [TextureDimension::D2, TextureDimension::Cube];

/// Relative index of the default 2D texture.
pub const DEFAULT_TEXTURE_INDEX: u32 = 0;
/// Relative index of the default cube texture.
pub const DEFAULT_CUBE_TEXTURE_INDEX: u32 = 1;

/// Relative index sampled by an unresolved texture parameter.
pub fn default_index(dimension: TextureDimension) -> u32 {
    match dimension {
        TextureDimension::D2 => DEFAULT_TEXTURE_INDEX,
        TextureDimension::Cube => DEFAULT_CUBE_TEXTURE_INDEX,
    }
}

#[derive(Debug, Clone, Copy)]
struct TextureSlot {
    absolute: u32,
    texture: TextureHandle,
}

#[derive(Debug, Clone, Copy)]
struct DefaultSlot {
    dimension: TextureDimension,
    absolute: u32,
    texture: Option<TextureHandle>,
}

/// Path-keyed bindless texture table over a descriptor heap.
///
/// 2D and cube views of one path are separate entries with separate slots.
pub struct BindlessTextureTable<H: DescriptorHeap> {
    heap: H,
    allocator: BindlessAllocator,
    slots: HashMap<(PathBuf, TextureDimension), TextureSlot>,
    defaults: Vec<DefaultSlot>,
}

impl<H: DescriptorHeap> BindlessTextureTable<H> {
    /// The first two slots are reserved for the default 2D and cube textures.
    pub fn new(heap: H, capacity: u32, base: u32) -> Self {
        let mut allocator = BindlessAllocator::new(capacity, base);
        let mut defaults = Vec::new();
        for dimension in DEFAULT_DIMENSIONS {
            match allocator.allocate() {
                Some(absolute) => defaults.push(DefaultSlot {
                    dimension,
                    absolute,
                    texture: None,
                }),
                None => log::warn!("bindless table of {capacity} slots has no {dimension:?} default"),
            }
        }
        Self {
            heap,
            allocator,
            slots: HashMap::new(),
            defaults,
        }
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }

    pub fn allocator(&self) -> &BindlessAllocator {
        &self.allocator
    }

    /// Number of texture views holding a slot, defaults excluded.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has_default_texture(&self) -> bool {
        !self.defaults.is_empty() && self.defaults.iter().all(|d| d.texture.is_some())
    }

    /// Write a texture view at an absolute slot.
    pub fn create_descriptor(
        &mut self,
        absolute: u32,
        texture: TextureHandle,
        dimension: TextureDimension,
    ) {
        self.heap.write_texture_view(absolute, texture, dimension);
    }

    /// Create and upload the white default textures into their reserved slots.
    pub fn ensure_default_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
    ) -> Result<()> {
        for i in 0..self.defaults.len() {
            let slot = self.defaults[i];
            if slot.texture.is_some() {
                continue;
            }
            let data = TextureData::white(slot.dimension);
            let texture = device.create_texture(&data.descriptor())?;
            ctx.upload_texture(texture, &data.data, data.width, data.height);
            self.create_descriptor(slot.absolute, texture, slot.dimension);
            self.defaults[i].texture = Some(texture);
        }
        Ok(())
    }

    /// Relative index of a path view that already holds a slot.
    pub fn index_of(&self, path: &Path, dimension: TextureDimension) -> Option<u32> {
        self.slots
            .get(&(path.to_path_buf(), dimension))
            .and_then(|slot| self.allocator.relative(slot.absolute))
    }

    /// Texture loaded for a path view.
    pub fn texture(&self, path: &Path, dimension: TextureDimension) -> Option<TextureHandle> {
        self.slots
            .get(&(path.to_path_buf(), dimension))
            .map(|slot| slot.texture)
    }

    /// Resolve a path to a relative bindless index, loading it on first use.
    ///
    /// Slot exhaustion and load failures are logged and yield the default
    /// index of `dimension`. The slot is taken before loading, so a full
    /// table never creates a texture.
    pub fn acquire(
        &mut self,
        path: &Path,
        dimension: TextureDimension,
        device: &mut dyn GraphicsDevice,
        ctx: &mut dyn CommandContext,
        loader: &mut dyn TextureLoader,
    ) -> u32 {
        if let Some(index) = self.index_of(path, dimension) {
            return index;
        }

        let Some(absolute) = self.allocator.allocate() else {
            log::error!(
                "bindless table full ({} slots); {} uses the default texture",
                self.allocator.capacity(),
                path.display()
            );
            return default_index(dimension);
        };
        let texture = match loader.load(path, dimension, device, ctx) {
            Ok(texture) => texture,
            Err(e) => {
                self.allocator.free(absolute);
                log::error!("failed to load texture {}: {e}; using default", path.display());
                return default_index(dimension);
            }
        };

        self.create_descriptor(absolute, texture, dimension);
        self.slots
            .insert((path.to_path_buf(), dimension), TextureSlot { absolute, texture });
        let relative = absolute - self.allocator.base_register();
        log::debug!(
            "texture {} ({dimension:?}) -> bindless slot {relative}",
            path.display()
        );
        relative
    }

    /// Free every slot of a path. The GPU must no longer reference them.
    pub fn release(&mut self, path: &Path) -> bool {
        let mut freed = Vec::new();
        self.slots.retain(|(slot_path, _), slot| {
            let keep = slot_path != path;
            if !keep {
                freed.push(slot.absolute);
            }
            keep
        });
        for absolute in &freed {
            self.allocator.free(*absolute);
        }
        !freed.is_empty()
    }

    /// Free every slot, including the default ones.
    pub fn clear(&mut self) {
        for (_, slot) in self.slots.drain() {
            self.allocator.free(slot.absolute);
        }
        for slot in self.defaults.drain(..) {
            self.allocator.free(slot.absolute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyCommandContext, DummyDescriptorHeap, DummyDevice, DummyTextureLoader};

    #[test]
    fn test_allocate_returns_absolute_indices() {
        let mut allocator = BindlessAllocator::new(4, 16);
        assert_eq!(allocator.allocate(), Some(16));
        assert_eq!(allocator.allocate(), Some(17));
        assert_eq!(allocator.relative(17), Some(1));
        assert_eq!(allocator.allocated_count(), 2);
    }

    #[test]
    fn test_exhaustion_leaves_bitmap_unchanged() {
        let mut allocator = BindlessAllocator::new(3, 0);
        for _ in 0..3 {
            assert!(allocator.allocate().is_some());
        }
        let before = allocator.bitmap().to_vec();
        assert_eq!(allocator.allocate(), None);
        assert_eq!(allocator.bitmap(), before.as_slice());
        assert_eq!(allocator.allocated_count(), 3);
    }

    #[test]
    fn test_cursor_rotates_and_wraps() {
        let mut allocator = BindlessAllocator::new(3, 0);
        let a = allocator.allocate().unwrap();
        allocator.allocate().unwrap();
        assert!(allocator.free(a));
        // cursor is past slot 1, so slot 2 comes before the freed slot 0
        assert_eq!(allocator.allocate(), Some(2));
        assert_eq!(allocator.allocate(), Some(0));
    }

    #[test]
    fn test_double_free() {
        let mut allocator = BindlessAllocator::new(2, 8);
        let slot = allocator.allocate().unwrap();
        assert!(allocator.free(slot));
        assert!(!allocator.free(slot));
        assert!(!allocator.free(100));
    }

    #[test]
    fn test_table_caches_by_path() {
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let mut loader = DummyTextureLoader::new();
        let mut table = BindlessTextureTable::new(DummyDescriptorHeap::new(), 8, 16);
        let d2 = TextureDimension::D2;

        let a = table.acquire(Path::new("a.png"), d2, &mut device, &mut ctx, &mut loader);
        let again = table.acquire(Path::new("a.png"), d2, &mut device, &mut ctx, &mut loader);
        let b = table.acquire(Path::new("b.png"), d2, &mut device, &mut ctx, &mut loader);
        assert_eq!(a, 2);
        assert_eq!(again, 2);
        assert_eq!(b, 3);
        assert_eq!(loader.requests.len(), 2);
        assert_eq!(table.heap().views[&18].dimension, d2);
    }

    #[test]
    fn test_cube_views_are_separate_entries() {
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let mut loader = DummyTextureLoader::new();
        let mut table = BindlessTextureTable::new(DummyDescriptorHeap::new(), 8, 16);

        let cube = table.acquire(
            Path::new("sky.dds"),
            TextureDimension::Cube,
            &mut device,
            &mut ctx,
            &mut loader,
        );
        let flat = table.acquire(
            Path::new("sky.dds"),
            TextureDimension::D2,
            &mut device,
            &mut ctx,
            &mut loader,
        );
        assert_ne!(cube, flat);
        assert_eq!(table.heap().views[&(16 + cube)].dimension, TextureDimension::Cube);
        assert_eq!(table.heap().views[&(16 + flat)].dimension, TextureDimension::D2);
        assert_eq!(device.textures[0].dimension, TextureDimension::Cube);

        assert!(table.release(Path::new("sky.dds")));
        assert!(table.is_empty());
        assert_eq!(table.allocator().allocated_count(), 2);
    }

    #[test]
    fn test_table_falls_back_to_default() {
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let mut loader = DummyTextureLoader::new();
        loader.mark_missing("gone.png");
        let mut table = BindlessTextureTable::new(DummyDescriptorHeap::new(), 3, 16);
        let d2 = TextureDimension::D2;

        assert_eq!(
            table.acquire(Path::new("gone.png"), d2, &mut device, &mut ctx, &mut loader),
            DEFAULT_TEXTURE_INDEX
        );
        // the failed load gave its slot back
        assert_eq!(table.allocator().allocated_count(), 2);
        assert_eq!(
            table.acquire(Path::new("one.png"), d2, &mut device, &mut ctx, &mut loader),
            2
        );
        assert_eq!(
            table.acquire(
                Path::new("sky.dds"),
                TextureDimension::Cube,
                &mut device,
                &mut ctx,
                &mut loader
            ),
            DEFAULT_CUBE_TEXTURE_INDEX
        );
    }

    #[test]
    fn test_full_table_loads_nothing() {
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let mut loader = DummyTextureLoader::new();
        let mut table = BindlessTextureTable::new(DummyDescriptorHeap::new(), 2, 16);

        let index = table.acquire(
            Path::new("a.png"),
            TextureDimension::D2,
            &mut device,
            &mut ctx,
            &mut loader,
        );
        assert_eq!(index, DEFAULT_TEXTURE_INDEX);
        assert!(loader.requests.is_empty());
        assert!(device.textures.is_empty());
        assert!(ctx.uploads.is_empty());
    }

    #[test]
    fn test_default_textures_and_clear() {
        let mut device = DummyDevice::new();
        let mut ctx = DummyCommandContext::new();
        let mut loader = DummyTextureLoader::new();
        let mut table = BindlessTextureTable::new(DummyDescriptorHeap::new(), 4, 16);

        table.ensure_default_texture(&mut device, &mut ctx).unwrap();
        assert!(table.has_default_texture());
        assert_eq!(table.heap().views[&16].dimension, TextureDimension::D2);
        assert_eq!(table.heap().views[&17].dimension, TextureDimension::Cube);
        table.acquire(
            Path::new("a.png"),
            TextureDimension::D2,
            &mut device,
            &mut ctx,
            &mut loader,
        );
        assert_eq!(table.allocator().allocated_count(), 3);

        assert!(table.release(Path::new("a.png")));
        assert_eq!(table.allocator().allocated_count(), 2);
        table.clear();
        assert_eq!(table.allocator().allocated_count(), 0);
    }
}
