//! The swapchain together with the slots built against it.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::K_RING_CAPACITY;
use crate::backend::GpuBackend;
use crate::error::RenderResult;

/// A backend surface plus one slot per usable image.
///
/// Slots depend on the surface extent, so they are always rebuilt with it.
/// Each recreation bumps [`PresentationSurface::generation`].
pub struct PresentationSurface<B: GpuBackend> {
    // Dropped before `surface`.
    slots: Vec<Mutex<B::Slot>>,
    surface: B::Surface,
    generation: u64,
}

impl<B: GpuBackend> PresentationSurface<B> {
    pub fn create(
        backend: &B,
        width: u32,
        height: u32,
        transform_capacity: usize,
    ) -> RenderResult<Self> {
        let surface = backend.create_surface(width, height)?;
        let slots = build_slots(backend, &surface, transform_capacity)?;
        Ok(Self {
            slots,
            surface,
            generation: 0,
        })
    }

    /// Tears down every slot, rebuilds the surface and then the slots.
    ///
    /// The device must be idle.
    pub fn recreate(
        &mut self,
        backend: &B,
        width: u32,
        height: u32,
        transform_capacity: usize,
    ) -> RenderResult<()> {
        self.slots.clear();
        backend.recreate_surface(&mut self.surface, width, height)?;
        self.slots = build_slots(backend, &self.surface, transform_capacity)?;
        self.generation += 1;
        Ok(())
    }

    /// Number of slots, also the number of frames that may be in flight.
    #[inline]
    pub fn ring_size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn surface(&self) -> &B::Surface {
        &self.surface
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &Mutex<B::Slot> {
        &self.slots[index]
    }
}

fn build_slots<B: GpuBackend>(
    backend: &B,
    surface: &B::Surface,
    transform_capacity: usize,
) -> RenderResult<Vec<Mutex<B::Slot>>> {
    let images = backend.image_count(surface);
    let count = images.clamp(1, K_RING_CAPACITY);
    if count != images {
        warn!(
            "Surface reports {} images; using {} frame slots",
            images, count
        );
    }

    let slots = (0..count)
        .map(|index| {
            backend
                .create_slot(surface, index, transform_capacity)
                .map(Mutex::new)
        })
        .collect::<RenderResult<Vec<_>>>()?;

    debug!("Built {} frame slots", slots.len());
    Ok(slots)
}
