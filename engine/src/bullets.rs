use serde::{Deserialize, Serialize};

use crate::geometry::in_bounds;
use crate::snake::Snake;
use crate::types::{Direction, PlayerSlot, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub position: Position,
    pub direction: Direction,
    pub owner: PlayerSlot,
}

/// A bullet that ended up on a snake segment this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulletHit {
    pub target: PlayerSlot,
    pub owner: PlayerSlot,
    pub position: Position,
}

impl Bullet {
    /// One cell ahead of `head`. Ammo is checked by the caller.
    pub fn fire(head: Position, direction: Direction, owner: PlayerSlot) -> Self {
        Self {
            position: head.step(direction),
            direction,
            owner,
        }
    }
}

/// Moves every bullet one cell and drops the ones that left the grid.
pub fn advance(bullets: &mut Vec<Bullet>, grid_size: i32) {
    bullets.retain_mut(|bullet| {
        bullet.position = bullet.position.step(bullet.direction);
        in_bounds(bullet.position, grid_size)
    });
}

/// Removes bullets sitting on a wall together with that wall cell. Returns the
/// destroyed cells and who shot them.
pub fn resolve_wall_hits(
    bullets: &mut Vec<Bullet>,
    walls: &mut Vec<Position>,
) -> Vec<(Position, PlayerSlot)> {
    let mut destroyed = Vec::new();
    bullets.retain(|bullet| match walls.iter().position(|w| *w == bullet.position) {
        Some(index) => {
            walls.remove(index);
            destroyed.push((bullet.position, bullet.owner));
            false
        }
        None => true,
    });
    destroyed
}

/// Consumes bullets that overlap any segment of the given snakes.
pub fn resolve_snake_hits(bullets: &mut Vec<Bullet>, snakes: &[(PlayerSlot, &Snake)]) -> Vec<BulletHit> {
    let mut hits = Vec::new();
    bullets.retain(|bullet| {
        let target = snakes
            .iter()
            .find(|(_, snake)| snake.occupies(bullet.position))
            .map(|(slot, _)| *slot);
        match target {
            Some(target) => {
                hits.push(BulletHit {
                    target,
                    owner: bullet.owner,
                    position: bullet.position,
                });
                false
            }
            None => true,
        }
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_spawns_ahead_of_head() {
        let bullet = Bullet::fire(Position::new(4, 4), Direction::Up, PlayerSlot::Two);
        assert_eq!(bullet.position, Position::new(4, 3));
        assert_eq!(bullet.owner, PlayerSlot::Two);
    }

    #[test]
    fn test_bullets_leaving_grid_are_dropped() {
        let mut bullets = vec![
            Bullet::fire(Position::new(18, 5), Direction::Right, PlayerSlot::One),
            Bullet::fire(Position::new(5, 5), Direction::Right, PlayerSlot::One),
        ];
        advance(&mut bullets, 20);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].position, Position::new(7, 5));
    }

    #[test]
    fn test_bullet_destroys_wall_two_ticks_out() {
        let (x, y) = (4, 7);
        let mut walls = vec![Position::new(x + 3, y), Position::new(0, 0)];
        let mut bullets = vec![Bullet {
            position: Position::new(x + 1, y),
            direction: Direction::Right,
            owner: PlayerSlot::One,
        }];

        advance(&mut bullets, 20);
        assert!(resolve_wall_hits(&mut bullets, &mut walls).is_empty());
        advance(&mut bullets, 20);
        let destroyed = resolve_wall_hits(&mut bullets, &mut walls);

        assert_eq!(destroyed, vec![(Position::new(x + 3, y), PlayerSlot::One)]);
        assert!(bullets.is_empty());
        assert_eq!(walls, vec![Position::new(0, 0)]);
    }

    #[test]
    fn test_snake_hit_consumes_bullet() {
        let snake = Snake::new(Position::new(10, 10), Direction::Right, 3);
        let mut bullets = vec![
            Bullet::fire(Position::new(8, 9), Direction::Down, PlayerSlot::Two),
            Bullet::fire(Position::new(2, 2), Direction::Down, PlayerSlot::Two),
        ];
        let hits = resolve_snake_hits(&mut bullets, &[(PlayerSlot::One, &snake)]);
        assert_eq!(
            hits,
            vec![BulletHit {
                target: PlayerSlot::One,
                owner: PlayerSlot::Two,
                position: Position::new(8, 10),
            }]
        );
        assert_eq!(bullets.len(), 1);
    }
}
