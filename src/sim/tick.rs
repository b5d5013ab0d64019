//! Simulation tick
//!
//! One `tick` call advances the whole arena: reset check, deferred shots,
//! player and weapons, enemy AI, sonar, physics, hits, explosions, contact
//! damage. Facts are collected in order and delivered at the end.

use glam::Vec2;

use super::combat::{Damageable, apply_explosion, apply_hit, scaled_contact_damage};
use super::events::{EventSink, GameEvent};
use super::physics::PhysicsProvider;
use super::projectile::Expiry;
use super::state::Arena;
use super::timers::DeferredAction;
use super::weapons::Trigger;

/// Autopilot keeps roughly this far from its target
const AUTOPILOT_STANDOFF: f32 = 260.0;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement keys as a vector (need not be normalized, zero = none)
    pub move_dir: Vec2,
    /// Aim direction; zero keeps the previous aim
    pub aim_dir: Vec2,
    pub fire_primary: bool,
    pub fire_secondary: bool,
    /// Switch between glide and snap movement
    pub toggle_movement: bool,
    /// Demo mode - a scripted pilot plays
    pub autopilot: bool,
}

/// Advance the arena to `now` (ms), `dt` seconds after the previous tick
pub fn tick(
    arena: &mut Arena,
    input: &TickInput,
    now: u64,
    dt: f32,
    physics: &mut impl PhysicsProvider,
    sink: &mut impl EventSink,
) {
    let mut out: Vec<GameEvent> = Vec::new();

    if arena.reset.tick(now) {
        out.push(arena.perform_reset(now, physics));
    }

    for action in arena.timers.drain_due(now) {
        match action {
            DeferredAction::EchoShot(params) => {
                arena.weapons.fire_echo(&params);
            }
        }
    }

    let input = if input.autopilot {
        autopilot(arena)
    } else {
        input.clone()
    };
    drive_player(arena, &input, now, dt);

    let mut expiries = arena.weapons.bullets.expire_out_of_range();
    expiries.extend(arena.weapons.rockets.expire_out_of_range());

    let player_pos = arena.player_pos();
    let playfield = arena.grid.playfield();
    arena.enemies.update(player_pos, dt, &playfield, &mut arena.rng);

    out.extend(arena.cells.tick_sonar(
        &arena.grid,
        &arena.settings,
        now,
        arena.enemies.positions(),
    ));

    step_bodies(arena, physics, dt, &mut expiries);
    resolve_projectile_hits(arena, &*physics, &mut out, &mut expiries);
    detonate(arena, expiries, &mut out);
    resolve_contact(arena, &*physics, now, &mut out);

    for event in &out {
        arena.ledger.credit(event, arena.settings.score_per_damage);
        sink.emit(event);
    }
}

fn drive_player(arena: &mut Arena, input: &TickInput, now: u64, dt: f32) {
    let Some(player) = arena.player.as_mut() else {
        return;
    };

    if input.toggle_movement {
        player.set_movement_mode(player.movement_mode.toggled());
    }
    player.steer(input.move_dir, dt, &arena.settings);

    let aim = match input.aim_dir.try_normalize() {
        Some(dir) => dir,
        None => crate::from_heading(player.aim),
    };
    player.aim_at(aim);

    let origin = player.body.pos;
    let trigger = Trigger {
        origin,
        aim,
        primary: input.fire_primary,
        secondary: input.fire_secondary,
    };
    let mods = arena
        .cells
        .projectile_mods_at(&arena.grid, &arena.settings, origin);
    let combat = arena.cells.combat_mods_at(&arena.grid, origin);
    arena.weapons.update(
        now,
        &trigger,
        &player.owner_tag(),
        &mods,
        &combat,
        &arena.settings,
        &mut arena.timers,
    );
}

/// Integrate every body and turn projectile contacts into expiries
fn step_bodies(arena: &mut Arena, physics: &mut impl PhysicsProvider, dt: f32, expiries: &mut Vec<Expiry>) {
    if let Some(player) = arena.player.as_mut() {
        physics.step(&mut player.body, dt);
    }
    for enemy in arena.enemies.iter_mut() {
        physics.step(&mut enemy.body, dt);
    }

    for pool in [&mut arena.weapons.bullets, &mut arena.weapons.rockets] {
        for projectile in pool.active_mut() {
            let contacts = physics.step(&mut projectile.body, dt);
            if contacts.world_bounds {
                expiries.extend(projectile.on_world_bounce());
            }
            if contacts.obstacle {
                expiries.extend(projectile.on_obstacle_impact());
            }
        }
    }
}

/// Bullets hit the first enemy they overlap; rockets detonate on contact
fn resolve_projectile_hits(
    arena: &mut Arena,
    physics: &impl PhysicsProvider,
    out: &mut Vec<GameEvent>,
    expiries: &mut Vec<Expiry>,
) {
    for bullet in arena.weapons.bullets.active_mut() {
        let target = arena
            .enemies
            .iter()
            .find(|e| physics.overlaps(&bullet.body, &e.body))
            .map(|e| e.id);
        if let Some(id) = target {
            apply_hit(&mut arena.enemies, id, bullet.damage, &bullet.owner, out);
            bullet.deactivate();
        }
    }

    for rocket in arena.weapons.rockets.active_mut() {
        if arena
            .enemies
            .iter()
            .any(|e| physics.overlaps(&rocket.body, &e.body))
        {
            expiries.push(rocket.expire());
        }
    }
}

fn detonate(arena: &mut Arena, expiries: Vec<Expiry>, out: &mut Vec<GameEvent>) {
    for expiry in expiries {
        let Expiry::Detonated {
            center,
            radius,
            damage,
            owner,
        } = expiry
        else {
            continue;
        };
        out.push(GameEvent::ExplosionOccurred {
            center,
            radius,
            damage,
            dealer_name: owner.name.clone(),
        });
        apply_explosion(&mut arena.enemies, center, radius, damage, &owner, out);
    }
}

/// Enemy touching the player, behind one shared cooldown
fn resolve_contact(arena: &mut Arena, physics: &impl PhysicsProvider, now: u64, out: &mut Vec<GameEvent>) {
    let Some(player) = arena.player.as_mut() else {
        return;
    };
    let Some(enemy) = arena
        .enemies
        .iter()
        .find(|e| physics.overlaps(&player.body, &e.body))
    else {
        return;
    };
    if !arena.contact.try_hit(now) {
        return;
    }

    let mods = arena.cells.combat_mods_at(&arena.grid, player.body.pos);
    let amount = player.take_damage(scaled_contact_damage(enemy.contact_damage, mods.in_damage_scale));
    if amount <= 0.0 {
        return;
    }
    out.push(GameEvent::PlayerDamaged {
        amount,
        remaining: player.health,
        enemy_id: enemy.id,
    });

    if player.is_dead() {
        let pos = player.body.pos;
        if let Some(dead) = arena.player.take() {
            arena.weapons.reset();
            log::info!("{} died at ({:.0}, {:.0})", dead.name, pos.x, pos.y);
            out.push(GameEvent::PlayerDied { name: dead.name, pos });
        }
    }
}

/// Scripted pilot: hold a standoff from the nearest enemy and shoot at it,
/// drift back to the middle when nothing is left
pub fn autopilot(arena: &Arena) -> TickInput {
    let Some(player) = arena.player.as_ref() else {
        return TickInput::default();
    };
    let pos = player.body.pos;
    let settings = &arena.settings;

    let nearest = arena.enemies.iter().min_by(|a, b| {
        a.body
            .pos
            .distance_squared(pos)
            .partial_cmp(&b.body.pos.distance_squared(pos))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    match nearest {
        Some(enemy) => {
            let to_enemy = enemy.body.pos - pos;
            let dist = to_enemy.length();
            let move_dir = if dist > AUTOPILOT_STANDOFF {
                to_enemy
            } else {
                -to_enemy
            };
            TickInput {
                move_dir,
                aim_dir: to_enemy,
                fire_primary: dist <= settings.primary_range,
                fire_secondary: dist <= settings.secondary_range
                    && dist > settings.secondary_explosion_radius,
                ..Default::default()
            }
        }
        None => TickInput {
            move_dir: arena.grid.playfield().center() - pos,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::consts::SIM_DT;
    use crate::sim::cells::SpecialRule;
    use crate::sim::enemy::{Enemy, EnemyKind};
    use crate::sim::physics::ArcadePhysics;
    use crate::Rect;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const TICK_MS: u64 = 16;

    fn setup(overrides: &[(&str, &str)]) -> (Arena, ArcadePhysics) {
        let mut pairs = vec![
            ("enemyCount", "0"),
            ("scIncludeEcho", "false"),
            ("scIncludePinball", "false"),
            ("scIncludeSonar", "false"),
        ];
        pairs.extend_from_slice(overrides);
        let (settings, rejected) = Settings::from_overrides(pairs);
        assert!(rejected.is_empty(), "{:?}", rejected);
        let mut physics = ArcadePhysics::new(Rect::new(Vec2::ZERO, Vec2::ZERO));
        let arena = Arena::new(settings, Some(7), 0, &mut physics);
        (arena, physics)
    }

    fn place_player(arena: &mut Arena, pos: Vec2) {
        arena.join("ace");
        if let Some(p) = arena.player.as_mut() {
            p.body.pos = pos;
        }
    }

    fn add_enemy(arena: &mut Arena, kind: EnemyKind, pos: Vec2) -> u32 {
        let id = arena.next_entity_id();
        let mut rng = Pcg32::seed_from_u64(id as u64);
        let enemy = Enemy::spawn(id, kind, pos, &arena.settings, &mut rng);
        arena.enemies.insert(enemy);
        id
    }

    fn run(
        arena: &mut Arena,
        physics: &mut ArcadePhysics,
        events: &mut Vec<GameEvent>,
        ticks: std::ops::Range<u64>,
        input: impl Fn(u64) -> TickInput,
    ) {
        for i in ticks {
            let now = i * TICK_MS;
            tick(arena, &input(i), now, SIM_DT, physics, events);
        }
    }

    #[test]
    fn test_reset_fires_on_schedule() {
        let (mut arena, mut physics) = setup(&[("enemyCount", "5"), ("serverResetIntervalMs", "1000")]);
        arena.ledger.upsert("ace", 42);
        let first = arena.enemies.ids();
        arena.enemies.remove(first[0]);

        let mut events = Vec::new();
        tick(&mut arena, &TickInput::default(), 999, SIM_DT, &mut physics, &mut events);
        assert!(events.is_empty());
        assert_eq!(arena.enemies.len(), 4);

        tick(&mut arena, &TickInput::default(), 1_000, SIM_DT, &mut physics, &mut events);
        assert_eq!(events, vec![GameEvent::ArenaReset { epoch: 1 }]);
        assert_eq!(arena.ledger.get("ace"), Some(0));
        assert_eq!(arena.enemies.len(), 5);
        assert_eq!(arena.reset.ends_at, 2_000);
    }

    #[test]
    fn test_bullet_kill_scores_once() {
        let (mut arena, mut physics) = setup(&[("primaryDamage", "80")]);
        place_player(&mut arena, Vec2::new(600.0, 600.0));
        let id = add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(660.0, 600.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..10, |i| TickInput {
            aim_dir: Vec2::X,
            fire_primary: i == 0,
            ..Default::default()
        });

        assert!(arena.enemies.get(id).is_none());
        let kills: Vec<&GameEvent> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyKilled { .. }))
            .collect();
        assert_eq!(kills.len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EnemyDamaged { amount, lethal: true, .. } if *amount == 60.0
        )));
        assert_eq!(arena.ledger.get("ace"), Some(10));
        assert_eq!(arena.weapons.bullets.active_count(), 0);
    }

    #[test]
    fn test_partial_damage_credit() {
        let (mut arena, mut physics) = setup(&[]);
        place_player(&mut arena, Vec2::new(600.0, 600.0));
        let id = add_enemy(&mut arena, EnemyKind::Strong, Vec2::new(660.0, 600.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..10, |i| TickInput {
            aim_dir: Vec2::X,
            fire_primary: i == 0,
            ..Default::default()
        });

        assert_eq!(arena.enemies.get(id).map(|e| e.health), Some(110.0));
        // round(10 * 0.25) = 3
        assert_eq!(arena.ledger.get("ace"), Some(3));
    }

    #[test]
    fn test_rocket_ricochets_then_detonates() {
        let (mut arena, mut physics) = setup(&[
            ("secondaryRicochetMax", "1"),
            ("secondaryRange", "100000"),
        ]);
        let playfield = arena.grid.playfield();
        place_player(&mut arena, Vec2::new(playfield.max.x - 40.0, playfield.center().y));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..20, |i| TickInput {
            aim_dir: Vec2::X,
            fire_secondary: i == 0,
            ..Default::default()
        });
        let rocket = arena.weapons.rockets.active().next().unwrap();
        assert_eq!(rocket.ricochet_count, 1);
        assert!(rocket.body.vel.x < 0.0);

        run(&mut arena, &mut physics, &mut events, 20..400, |_| TickInput::default());
        let explosions: Vec<&GameEvent> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ExplosionOccurred { .. }))
            .collect();
        assert_eq!(explosions.len(), 1);
        match explosions[0] {
            GameEvent::ExplosionOccurred { center, radius, .. } => {
                assert!((center.x - (playfield.min.x + 6.0)).abs() < 1e-3);
                assert_eq!(*radius, 90.0);
            }
            _ => unreachable!(),
        }
        assert_eq!(arena.weapons.rockets.active_count(), 0);
    }

    fn echo_cell_center(arena: &Arena) -> Vec2 {
        let echo = arena
            .cells
            .cells()
            .iter()
            .find(|c| c.rule == SpecialRule::Echo)
            .map(|c| c.addr)
            .unwrap();
        arena.grid.cell_to_center(echo)
    }

    #[test]
    fn test_echo_cell_fires_delayed_bullet() {
        let (mut arena, mut physics) = setup(&[("scIncludeEcho", "true"), ("scCountEcho", "3")]);
        let center = echo_cell_center(&arena);
        place_player(&mut arena, center);

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..1, |_| TickInput {
            aim_dir: Vec2::X,
            fire_primary: true,
            ..Default::default()
        });
        assert_eq!(arena.weapons.bullets.active_count(), 1);
        assert_eq!(arena.timers.len(), 1);

        run(&mut arena, &mut physics, &mut events, 1..9, |_| TickInput::default());
        assert_eq!(arena.weapons.bullets.active_count(), 2);
        assert!(arena.timers.is_empty());
        let speeds: Vec<f32> = arena.weapons.bullets.active().map(|b| b.body.speed()).collect();
        assert!(speeds.iter().any(|s| (s - 540.0).abs() < 1e-2));
        assert!(speeds.iter().any(|s| (s - 900.0).abs() < 1e-2));
    }

    #[test]
    fn test_echo_outlives_first_bullet_and_shooter() {
        let (mut arena, mut physics) = setup(&[("scIncludeEcho", "true"), ("scCountEcho", "3")]);
        let center = echo_cell_center(&arena);
        place_player(&mut arena, center);

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..1, |_| TickInput {
            aim_dir: Vec2::X,
            fire_primary: true,
            ..Default::default()
        });
        let origin = arena.weapons.bullets.active().next().map(|b| b.spawn_pos).unwrap();

        // First bullet gone and the shooter destroyed long before the echo is due
        arena.weapons.bullets.clear();
        arena.player = None;
        run(&mut arena, &mut physics, &mut events, 1..8, |_| TickInput::default());
        assert_eq!(arena.weapons.bullets.active_count(), 0);
        assert_eq!(arena.timers.len(), 1);

        run(&mut arena, &mut physics, &mut events, 8..9, |_| TickInput::default());
        assert!(arena.timers.is_empty());
        let echo: Vec<_> = arena.weapons.bullets.active().collect();
        assert_eq!(echo.len(), 1);
        assert_eq!(echo[0].spawn_pos, origin);
        assert!((echo[0].body.speed() - 540.0).abs() < 1e-2);
        assert!(echo[0].body.vel.normalize().abs_diff_eq(Vec2::X, 1e-4));
    }

    #[test]
    fn test_leaving_cancels_pending_echo() {
        let (mut arena, mut physics) = setup(&[("scIncludeEcho", "true"), ("scCountEcho", "3")]);
        let center = echo_cell_center(&arena);
        place_player(&mut arena, center);
        add_enemy(&mut arena, EnemyKind::Normal, center + Vec2::new(240.0, 0.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..1, |_| TickInput {
            aim_dir: Vec2::X,
            fire_primary: true,
            ..Default::default()
        });
        assert_eq!(arena.timers.len(), 1);

        assert!(arena.leave().is_some());
        assert!(arena.timers.is_empty());
        run(&mut arena, &mut physics, &mut events, 1..40, |_| TickInput::default());

        assert_eq!(arena.weapons.bullets.active_count(), 0);
        assert_eq!(arena.ledger.get("ace"), None);
        assert!(arena.leaderboard().is_empty());
    }

    #[test]
    fn test_contact_cooldown_shared() {
        let (mut arena, mut physics) = setup(&[]);
        place_player(&mut arena, Vec2::new(900.0, 900.0));
        add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(905.0, 900.0));
        add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(895.0, 900.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..63, |_| TickInput::default());
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerDamaged { .. }))
            .count();
        assert_eq!(hits, 3);
        assert_eq!(arena.player.as_ref().map(|p| p.health), Some(64.0));
    }

    #[test]
    fn test_player_death_clears_projectiles() {
        let (mut arena, mut physics) = setup(&[("playerMaxHealth", "10")]);
        place_player(&mut arena, Vec2::new(900.0, 900.0));
        // Touching the player but clear of the line of fire
        add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(900.0, 878.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..1, |_| TickInput {
            aim_dir: Vec2::Y,
            fire_primary: true,
            fire_secondary: true,
            ..Default::default()
        });

        assert!(arena.player.is_none());
        assert_eq!(arena.weapons.bullets.active_count(), 0);
        assert_eq!(arena.weapons.rockets.active_count(), 0);
        assert!(events.contains(&GameEvent::PlayerDamaged {
            amount: 10.0,
            remaining: 0.0,
            enemy_id: arena.enemies.ids()[0],
        }));
        assert!(matches!(events.last(), Some(GameEvent::PlayerDied { name, .. }) if name == "ace"));

        // World keeps running without a player
        run(&mut arena, &mut physics, &mut events, 1..5, |_| TickInput::default());
    }

    #[test]
    fn test_explosion_event_carries_dealer() {
        let (mut arena, mut physics) = setup(&[]);
        place_player(&mut arena, Vec2::new(600.0, 600.0));
        let near = add_enemy(&mut arena, EnemyKind::Strong, Vec2::new(700.0, 600.0));
        let splash = add_enemy(&mut arena, EnemyKind::Strong, Vec2::new(700.0, 680.0));

        let mut events = Vec::new();
        run(&mut arena, &mut physics, &mut events, 0..12, |i| TickInput {
            aim_dir: Vec2::X,
            fire_secondary: i == 0,
            ..Default::default()
        });

        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::ExplosionOccurred { dealer_name, damage, .. } if dealer_name == "ace" && *damage == 80.0
        )));
        assert_eq!(arena.enemies.get(near).map(|e| e.health), Some(40.0));
        assert_eq!(arena.enemies.get(splash).map(|e| e.health), Some(40.0));
        // Two non-lethal hits of 80 at 0.25 per damage
        assert_eq!(arena.ledger.get("ace"), Some(40));
    }

    #[test]
    fn test_autopilot_aims_at_nearest() {
        let (mut arena, _) = setup(&[]);
        place_player(&mut arena, Vec2::new(600.0, 600.0));
        add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(1000.0, 600.0));
        add_enemy(&mut arena, EnemyKind::Normal, Vec2::new(600.0, 1500.0));

        let input = autopilot(&arena);
        assert_eq!(input.aim_dir, Vec2::new(400.0, 0.0));
        assert_eq!(input.move_dir, Vec2::new(400.0, 0.0));
        assert!(input.fire_primary && input.fire_secondary);

        arena.enemies.clear();
        let idle = autopilot(&arena);
        assert!(!idle.fire_primary);
        assert_eq!(idle.move_dir, arena.grid.playfield().center() - Vec2::new(600.0, 600.0));
    }
}
