use gridcast::*;
use glam::Vec2;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const MAP: [&str; 7] = [
    "##########",
    "#........#",
    "#..o..G..#",
    "#@...D...#",
    "#..=..h..#",
    "#........#",
    "##########",
];

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridcast=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let cfg = WorldConfig::default();
    let level = LevelDesc::from_ascii(&MAP, cfg.cell_size);
    let mut world = World::from_level(cfg, &level)?;
    if let Some(door) = world.cell_mut(5, 3) {
        door.set_slide_amount(24.0);
    }

    let Some(&player) = world.dynamic_ids().first() else {
        println!("No player in map");
        return Ok(());
    };
    let eye = world.body(player).map_or(Vec2::ZERO, |b| b.position().truncate());

    for step in 0..9 {
        let angle = -std::f32::consts::FRAC_PI_4 + step as f32 * std::f32::consts::FRAC_PI_8 * 0.5;
        let req = RayRequest::new(eye, angle).ignore_body(player);
        let sections = RayCaster::cast_ray(&world, &req);
        print!("angle {:+.3}:", angle);
        for s in &sections {
            match s.cell {
                Some(c) => print!(" [{} {:?} d={:.1}", c, s.side, s.distance),
                None => print!(" [miss d={:.1}", s.distance),
            }
            if s.is_overlay {
                print!(" overlay");
            }
            for b in &s.encountered_bodies {
                print!(" body={:?}@{:.1}", b.id, b.distance);
            }
            print!("]");
        }
        println!();
    }

    let mut graphs = PathGraphs::build(&world, false);
    let goal = glam::IVec2::new(8, 5);
    let route = graphs.search_avoiding_bodies(&world, player, PathMode::Cautious, goal, false);
    let cells: Vec<String> = route.iter().map(|n| n.pos().to_string()).collect();
    println!("route: {}", cells.join(" -> "));
    Ok(())
}
