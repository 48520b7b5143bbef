use std::thread;

use proptest::prelude::*;
use strand_arena::{ArenaConfig, ChunkArena, ChunkHandle, Growth};
use strand_store::{ParticleStore, SolverBuffers, SolverConfig};

struct Body {
    id: u32,
    particles: ChunkHandle,
    springs: ChunkHandle,
}

fn buffers() -> SolverBuffers {
    SolverBuffers::new(SolverConfig::new(
        ArenaConfig::new(16).with_growth(Growth::Increment(8)),
        ArenaConfig::new(16).with_growth(Growth::Increment(8)),
    ))
    .unwrap()
}

fn write_body(particles: &mut ChunkArena<ParticleStore>, body: &Body) {
    let units = particles.units(body.particles).unwrap();
    let begin = units.start;
    for i in units {
        let local = (i - begin) as f32;
        particles
            .store_mut()
            .set(i, [body.id as f32, local, 0.0, 1.0], [0.0; 3], body.id as i32);
    }
}

fn assert_body(particles: &ChunkArena<ParticleStore>, body: &Body) {
    let units = particles.units(body.particles).unwrap();
    let begin = units.start;
    for i in units {
        let p = particles.store().positions()[i];
        assert_eq!(p[0], body.id as f32, "body {} lost its particles", body.id);
        assert_eq!(p[1], (i - begin) as f32);
        assert_eq!(particles.store().phases()[i], body.id as i32);
    }
}

#[test]
fn bodies_survive_removal_and_capacity_shrink() {
    let mut buffers = buffers();
    let mut mapped = buffers.map();
    let mut bodies = Vec::new();
    for id in 0..6u32 {
        let (particles, springs) = mapped.split_mut();
        let body = Body {
            id,
            particles: particles.allocate(3 + id % 3).unwrap(),
            springs: springs.allocate(2).unwrap(),
        };
        write_body(particles, &body);
        bodies.push(body);
    }
    drop(mapped);
    assert_eq!(buffers.upload_epoch(), 1);

    let mut mapped = buffers.map();
    for body in bodies.iter().filter(|b| b.id % 2 == 0) {
        mapped.particles_mut().deallocate(body.particles);
        mapped.springs_mut().deallocate(body.springs);
    }
    bodies.retain(|b| b.id % 2 == 1);
    let occupied = mapped.particles().occupied_units();
    mapped.particles_mut().resize_capacity(occupied).unwrap();
    assert_eq!(mapped.particles().capacity(), occupied);

    // Springs re-derive their endpoints from the moved particle chunks.
    let (particles, springs) = mapped.split_mut();
    for body in &bodies {
        assert_body(particles, body);
        let a = particles.unit_index(body.particles, 0).unwrap() as i32;
        let b = particles.unit_index(body.particles, 1).unwrap() as i32;
        for s in springs.units(body.springs).unwrap() {
            springs.store_mut().set(s, [a, b], 1.0, 1.0);
        }
    }
    for body in &bodies {
        let s = springs.unit_index(body.springs, 0).unwrap();
        let [a, _] = springs.store().endpoints()[s];
        let p = particles.store().positions()[a as usize];
        assert_eq!(p[0], body.id as f32);
        assert_eq!(p[1], 0.0);
    }
    assert_eq!(mapped.unmap(), 2);
}

#[test]
fn device_passes_never_overlap_host_mapping() {
    const STEPS: u64 = 50;
    let mut buffers = buffers();
    let fence = buffers.fence().clone();

    thread::scope(|scope| {
        let device = fence.clone();
        let worker = scope.spawn(move || {
            let mut last = 0;
            let mut passes = 0;
            while last < STEPS {
                let pass = device.begin_device_pass();
                assert!(!device.is_mapped());
                assert!(pass.epoch() >= last);
                last = pass.epoch();
                passes += 1;
                drop(pass);
                thread::yield_now();
            }
            passes
        });

        let mut body = None;
        for step in 0..STEPS {
            let mut mapped = buffers.map();
            assert_eq!(fence.active_device_passes(), 0);
            if let Some(h) = body.take() {
                mapped.particles_mut().deallocate(h);
            }
            let size = 1 + (step % 5) as u32;
            body = Some(mapped.particles_mut().allocate(size).unwrap());
        }
        let passes = worker.join().unwrap();
        assert!(passes >= 1);
    });
    assert_eq!(buffers.upload_epoch(), STEPS);
}

proptest! {
    #[test]
    fn particle_payload_survives_churn_and_compaction(
        ops in prop::collection::vec((0u8..3, 1u32..6), 1..60),
    ) {
        let mut buffers = SolverBuffers::new(SolverConfig::new(
            ArenaConfig::new(8).with_growth(Growth::Increment(4)),
            ArenaConfig::fixed(0),
        ))
        .unwrap();
        let mut mapped = buffers.map();
        let mut bodies: Vec<Body> = Vec::new();
        let mut next_id = 0;
        for (op, n) in ops {
            let particles = mapped.particles_mut();
            match op {
                0 => {
                    let body = Body {
                        id: next_id,
                        particles: particles.allocate(n).unwrap(),
                        springs: ChunkHandle::Empty,
                    };
                    next_id += 1;
                    write_body(particles, &body);
                    bodies.push(body);
                }
                1 if !bodies.is_empty() => {
                    let body = bodies.remove(n as usize % bodies.len());
                    particles.deallocate(body.particles);
                }
                _ => {
                    particles.compact();
                }
            }
            for body in &bodies {
                assert_body(mapped.particles(), body);
            }
        }
        let occupied = mapped.particles().occupied_units();
        mapped.particles_mut().resize_capacity(occupied).unwrap();
        for body in &bodies {
            assert_body(mapped.particles(), body);
        }
    }
}
