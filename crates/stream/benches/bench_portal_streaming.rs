use std::hint::black_box;
use std::time::Instant;

use glam::Vec3;
use portalspace_assets::{MemorySource, PortalDescriptor, PortalDestination, WorldDocument};
use portalspace_common::{Pose, Slot, WorldUrl};
use portalspace_render::HeadlessScene;
use portalspace_stream::{GridLayout, SlotAllocator, StreamConfig, StreamController};

/// Ring of `count` worlds, each with portals to both neighbours.
fn make_ring(count: usize) -> MemorySource {
    let mut source = MemorySource::new();
    for i in 0..count {
        let next = (i + 1) % count;
        let prev = (i + count - 1) % count;
        let portal = |dest: usize, x: f32| PortalDescriptor {
            start: Pose::at(Vec3::new(x, 0.0, 0.0)),
            destination: PortalDestination {
                url: format!("w{dest}"),
                pose: Pose::default(),
            },
        };
        source.insert(
            WorldUrl::parse(format!("w{i}")).unwrap(),
            WorldDocument {
                name: None,
                splat_url: format!("w{i}.splat"),
                spawn: Pose::default(),
                portals: vec![portal(next, 5.0), portal(prev, -5.0)],
            },
        );
    }
    source
}

fn bench_mapper(iterations: u32) {
    let grid = GridLayout::default();
    let p = Vec3::new(12.0, 3.0, -40.0);
    let start = Instant::now();
    for s in 0..iterations {
        let shared = grid.to_shared(black_box(p), Slot(s));
        let _ = black_box(grid.to_local(shared, Slot(s)));
    }
    let elapsed = start.elapsed();
    println!(
        "  to_shared+to_local ({iterations} slots): {:?}/iter, total {elapsed:?}",
        elapsed / iterations
    );
}

fn bench_allocator(iterations: u32) {
    let mut slots = SlotAllocator::new();
    let start = Instant::now();
    for _ in 0..iterations {
        let a = slots.allocate();
        let b = slots.allocate();
        slots.release(black_box(a));
        let c = black_box(slots.allocate());
        slots.release(b);
        slots.release(c);
    }
    assert_eq!(slots.live_count(), 0);
    let elapsed = start.elapsed();
    println!(
        "  allocate/release churn ({iterations} iters): {:?}/iter, total {elapsed:?}",
        elapsed / iterations
    );
}

fn bench_ring_walk(worlds: usize, hops: u32, steps: usize) {
    let config = StreamConfig {
        preload_hops: hops,
        ..StreamConfig::default()
    };
    let mut controller = StreamController::new(config, make_ring(worlds), HeadlessScene::new());
    let root = WorldUrl::parse("w0").unwrap();
    controller.load_world_as_root(&root, None).unwrap();

    let start = Instant::now();
    for _ in 0..steps {
        let current = controller.root().unwrap().clone();
        let state = controller.registry().get(&current).unwrap();
        // Descriptor 0 always leads to the next world around the ring.
        let Some(link) = state.links().iter().find(|l| l.descriptor() == 0) else {
            break;
        };
        let link = link.id();
        let _ = black_box(controller.on_cross(link, true).unwrap());
        for done in controller.scene_mut().finish_loads() {
            controller.complete_asset(done);
        }
    }
    let elapsed = start.elapsed();
    println!(
        "  ring walk ({worlds} worlds, hops={hops}, {steps} crossings): {:?}/crossing, total {elapsed:?}",
        elapsed / steps as u32
    );
}

fn main() {
    println!("=== Portal Streaming Benchmarks ===\n");

    println!("Grid mapper:");
    bench_mapper(1_000_000);

    println!("\nSlot allocator:");
    bench_allocator(1_000_000);

    println!("\nCrossing churn (flush + expand):");
    bench_ring_walk(16, 1, 1000);
    bench_ring_walk(64, 2, 1000);
    bench_ring_walk(256, 4, 200);

    println!("\n=== Done ===");
}
