use std::fmt;

use rand::Rng;
use types::Widget;

use super::ProducerError;
use crate::assets::AssetStore;

pub const MEWO: &str = "mewo";

/// Where the cat is and what it is doing. Each pose has a sprite at
/// `mewo/<pose>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    Sleep,
    Desk,
    Floor,
}

impl Pose {
    pub const ALL: [Self; 3] = [Self::Sleep, Self::Desk, Self::Floor];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Desk => "desk",
            Self::Floor => "floor",
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The virtual pet.
///
/// While awake it wanders between poses; once put to bed it ignores
/// everything until woken.
#[derive(Debug)]
pub struct Mewo {
    assets: AssetStore,
    z: i32,
    pose: Option<Pose>,
    asleep: bool,
}

impl Mewo {
    #[must_use]
    pub const fn new(assets: AssetStore, z: i32) -> Self {
        Self {
            assets,
            z,
            pose: None,
            asleep: false,
        }
    }

    #[must_use]
    pub const fn pose(&self) -> Option<Pose> {
        self.pose
    }

    #[must_use]
    pub const fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Strike a random pose. Nothing while asleep.
    ///
    /// # Errors
    ///
    /// If the sprite for the chosen pose cannot be loaded.
    pub fn random(&mut self) -> Result<Option<Widget>, ProducerError> {
        self.random_with(&mut rand::thread_rng())
    }

    /// [`random`](Self::random) with a caller supplied source of
    /// randomness.
    ///
    /// # Errors
    ///
    /// If the sprite for the chosen pose cannot be loaded.
    pub fn random_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<Widget>, ProducerError> {
        if self.asleep {
            tracing::debug!("mewo is asleep, ignoring");
            return Ok(None);
        }

        let pose = Pose::ALL[rng.gen_range(0..Pose::ALL.len())];
        self.pose = Some(pose);
        tracing::info!(%pose, "mewo moved");
        self.sprite(pose).map(Some)
    }

    /// Go to bed. The sleeping sprite is only drawn if the cat is not
    /// already curled up.
    ///
    /// # Errors
    ///
    /// If the sleeping sprite cannot be loaded. The cat stays awake.
    pub fn sleep(&mut self) -> Result<Option<Widget>, ProducerError> {
        if self.asleep {
            return Ok(None);
        }

        let widget = if self.pose == Some(Pose::Sleep) {
            None
        } else {
            Some(self.sprite(Pose::Sleep)?)
        };

        self.pose = Some(Pose::Sleep);
        self.asleep = true;
        tracing::info!("mewo went to sleep");
        Ok(widget)
    }

    /// Wake up. The sprite stays as it is until the next random pose.
    pub fn awake(&mut self) {
        self.asleep = false;
        tracing::info!("mewo woke up");
    }

    fn sprite(&self, pose: Pose) -> Result<Widget, ProducerError> {
        self.assets.widget(MEWO, self.z, &format!("mewo/{pose}"))
    }
}
