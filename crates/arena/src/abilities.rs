//! Demo abilities
//!
//! Each ability keeps the state it needs for flight or duration and exposes
//! colliders that follow it. Movement is per tick, not per second.

use std::sync::Arc;
use std::time::Duration;

use ability_engine::prelude::*;

/// Register every demo ability type
pub fn registry() -> Result<AbilityRegistry, ability_engine::ability::RegistryError> {
    let mut registry = AbilityRegistry::new();
    registry.register(
        AbilityDescription::builder("FireBlast", FireBlast::create)
            .activation(Activation::ATTACK)
            .cooldown(Duration::from_millis(1500))
            .build(),
    )?;
    registry.register(
        AbilityDescription::builder("EarthBlast", EarthBlast::create)
            .activation(Activation::SNEAK_RELEASE)
            .cooldown(Duration::from_secs(2))
            .build(),
    )?;
    registry.register(
        AbilityDescription::builder("Lightning", Lightning::create)
            .activation(Activation::SEQUENCE)
            .cooldown(Duration::from_secs(4))
            .build(),
    )?;
    registry.register(
        AbilityDescription::builder("AirShield", AirShield::create)
            .activation(Activation::SNEAK)
            .cooldown(Duration::from_secs(3))
            .build(),
    )?;
    registry.register(
        AbilityDescription::builder("GracefulDescent", GracefulDescent::create)
            .activation(Activation::PASSIVE)
            .build(),
    )?;
    Ok(registry)
}

fn not_active(description: &AbilityDescription) -> AbilityError {
    AbilityError::InvalidState(format!("{description} updated before activation"))
}

fn eye(user: &dyn User) -> Vec3 {
    user.location() + Vec3::new(0.0, 1.6, 0.0)
}

/// Straight-line projectile state shared by the blasts
struct Flight {
    user: UserHandle,
    origin: Vec3,
    position: Vec3,
    direction: Vec3,
}

impl Flight {
    fn launch(user: UserHandle, direction: Vec3) -> Self {
        let origin = eye(user.as_ref());
        Self {
            user,
            origin,
            position: origin,
            direction,
        }
    }

    /// Advance by `step`; false once `range` is exceeded
    fn advance(&mut self, step: f64, range: f64) -> bool {
        self.position += self.direction * step;
        (self.position - self.origin).norm() <= range
    }
}

fn aim(user: &UserHandle, fallback: Vec3) -> Vec3 {
    let to_center = -user.location();
    if to_center.norm() > 1e-6 {
        Vec3::new(to_center.x, 0.0, to_center.z).try_normalize(1e-6).unwrap_or(fallback)
    } else {
        fallback
    }
}

/// Fast fire projectile
pub struct FireBlast {
    description: Arc<AbilityDescription>,
    flight: Option<Flight>,
}

impl FireBlast {
    const SPEED: f64 = 1.2;
    const RANGE: f64 = 24.0;
    const RADIUS: f64 = 0.6;

    fn create(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self { description, flight: None })
    }
}

impl Ability for FireBlast {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, _method: Activation) -> bool {
        if !user.can_activate(&self.description) {
            return false;
        }
        let direction = aim(&user, Vec3::x());
        self.flight = Some(Flight::launch(user, direction));
        true
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        let flight = self.flight.as_mut().ok_or_else(|| not_active(&self.description))?;
        if !flight.user.is_valid() || !flight.advance(Self::SPEED, Self::RANGE) {
            return Ok(UpdateResult::Remove);
        }
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self) {
        if let Some(flight) = &self.flight {
            flight.user.add_cooldown(&self.description, self.description.cooldown());
        }
    }

    fn colliders(&self) -> Vec<Collider> {
        self.flight
            .as_ref()
            .map(|flight| vec![Sphere::new(flight.position, Self::RADIUS).into()])
            .unwrap_or_default()
    }

    fn on_collision(&mut self, collision: &mut Collision) {
        log::info!(
            "FireBlast of {} hit {} of {}",
            collision.own().owner,
            collision.other().ability,
            collision.other().owner
        );
    }
}

/// Slow rock slab, oriented along its flight direction
pub struct EarthBlast {
    description: Arc<AbilityDescription>,
    flight: Option<Flight>,
    rotation: Quat,
}

impl EarthBlast {
    const SPEED: f64 = 0.7;
    const RANGE: f64 = 20.0;
    const HALF_EXTENTS: [f64; 3] = [0.8, 0.5, 0.5];

    fn create(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self {
            description,
            flight: None,
            rotation: Quat::identity(),
        })
    }
}

impl Ability for EarthBlast {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, _method: Activation) -> bool {
        if !user.can_activate(&self.description) {
            return false;
        }
        let direction = aim(&user, -Vec3::x());
        self.rotation = Quat::rotation_between(&Vec3::x(), &direction).unwrap_or_else(Quat::identity);
        self.flight = Some(Flight::launch(user, direction));
        true
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        let flight = self.flight.as_mut().ok_or_else(|| not_active(&self.description))?;
        if !flight.user.is_valid() {
            return Ok(UpdateResult::Remove);
        }
        if !flight.advance(Self::SPEED, Self::RANGE) {
            ctx.add_updatable(Box::new(Rubble::new(flight.position)));
            return Ok(UpdateResult::Remove);
        }
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self) {
        if let Some(flight) = &self.flight {
            flight.user.add_cooldown(&self.description, self.description.cooldown());
        }
    }

    fn colliders(&self) -> Vec<Collider> {
        let Some(flight) = &self.flight else {
            return Vec::new();
        };
        let [x, y, z] = Self::HALF_EXTENTS;
        let slab = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(x, y, z));
        vec![Obb::from_aabb_rotated(&slab, &self.rotation).at(flight.position).into()]
    }
}

/// Debris an EarthBlast leaves where it runs out of range
struct Rubble {
    position: Vec3,
    ticks_left: u32,
}

impl Rubble {
    const SETTLE_TICKS: u32 = 40;

    fn new(position: Vec3) -> Self {
        Self { position, ticks_left: Self::SETTLE_TICKS }
    }
}

impl Updatable for Rubble {
    fn update(&mut self) -> UpdateResult {
        self.ticks_left = self.ticks_left.saturating_sub(1);
        if self.ticks_left > 0 {
            return UpdateResult::Continue;
        }
        log::debug!("Rubble settled at {:.1}, {:.1}, {:.1}", self.position.x, self.position.y, self.position.z);
        UpdateResult::Remove
    }
}

/// Instant strike along the user's view
///
/// Lives for exactly one collision pass.
pub struct Lightning {
    description: Arc<AbilityDescription>,
    strike: Option<(UserHandle, Ray)>,
    discharged: bool,
}

impl Lightning {
    const RANGE: f64 = 18.0;

    fn create(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self {
            description,
            strike: None,
            discharged: false,
        })
    }
}

impl Ability for Lightning {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, _method: Activation) -> bool {
        if !user.can_activate(&self.description) {
            return false;
        }
        let ray = Ray::new(eye(user.as_ref()), aim(&user, Vec3::x()) * Self::RANGE);
        self.strike = Some((user, ray));
        true
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        if self.strike.is_none() {
            return Err(not_active(&self.description));
        }
        if self.discharged {
            return Ok(UpdateResult::Remove);
        }
        log::debug!("Lightning discharged on tick {}", ctx.tick());
        self.discharged = true;
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self) {
        if let Some((user, _)) = &self.strike {
            user.add_cooldown(&self.description, self.description.cooldown());
        }
    }

    fn colliders(&self) -> Vec<Collider> {
        self.strike
            .as_ref()
            .map(|(_, ray)| vec![Collider::Ray(*ray)])
            .unwrap_or_default()
    }
}

/// Spinning wind barrier in front of the user
pub struct AirShield {
    description: Arc<AbilityDescription>,
    user: Option<UserHandle>,
    ticks: u32,
}

impl AirShield {
    const DURATION_TICKS: u32 = 80;
    const RADIUS: f64 = 2.5;
    const THICKNESS: f64 = 0.4;

    fn create(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self {
            description,
            user: None,
            ticks: 0,
        })
    }
}

impl Ability for AirShield {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, _method: Activation) -> bool {
        if !user.can_activate(&self.description) {
            return false;
        }
        self.user = Some(user);
        true
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        let user = self.user.as_ref().ok_or_else(|| not_active(&self.description))?;
        self.ticks += 1;
        if !user.is_valid() || self.ticks > Self::DURATION_TICKS {
            return Ok(UpdateResult::Remove);
        }
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self) {
        if let Some(user) = &self.user {
            user.add_cooldown(&self.description, self.description.cooldown());
        }
    }

    fn colliders(&self) -> Vec<Collider> {
        let Some(user) = &self.user else {
            return Vec::new();
        };
        let center = eye(user.as_ref()) + aim(user, Vec3::x()) * 2.0;
        let face = Aabb::from_center_extents(
            Vec3::zeros(),
            Vec3::new(Self::THICKNESS, Self::RADIUS, Self::RADIUS),
        );
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), f64::from(self.ticks) * 0.05);
        vec![Disk::new(
            Obb::from_aabb_rotated(&face, &yaw).at(center),
            Sphere::new(center, Self::RADIUS),
        )
        .into()]
    }

    fn on_collision(&mut self, collision: &mut Collision) {
        log::info!("AirShield of {} deflected {}", collision.own().owner, collision.other().ability);
    }
}

/// Passive that lasts while the user is online and has no volume
pub struct GracefulDescent {
    description: Arc<AbilityDescription>,
    user: Option<UserHandle>,
}

impl GracefulDescent {
    fn create(description: Arc<AbilityDescription>) -> Box<dyn Ability> {
        Box::new(Self { description, user: None })
    }
}

impl Ability for GracefulDescent {
    fn description(&self) -> &Arc<AbilityDescription> {
        &self.description
    }

    fn activate(&mut self, user: UserHandle, method: Activation) -> bool {
        if method != Activation::PASSIVE {
            return false;
        }
        self.user = Some(user);
        true
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) -> Result<UpdateResult, AbilityError> {
        let user = self.user.as_ref().ok_or_else(|| not_active(&self.description))?;
        Ok(if user.is_valid() {
            UpdateResult::Continue
        } else {
            UpdateResult::Remove
        })
    }

    fn on_destroy(&mut self) {}
}
