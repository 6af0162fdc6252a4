//! Static fallback vocabulary used when the store cannot be reached.
//!
//! Sound URLs point at assets bundled with the reader app, so a cold start
//! with no connectivity still reacts to the common storybook words.

/// (canonical word, bundled sound asset)
pub const BUILTIN_TRIGGERS: &[(&str, &str)] = &[
    ("roar", "assets/sounds/roar.ogg"),
    ("bark", "assets/sounds/bark.ogg"),
    ("meow", "assets/sounds/meow.ogg"),
    ("moo", "assets/sounds/moo.ogg"),
    ("quack", "assets/sounds/quack.ogg"),
    ("splash", "assets/sounds/splash.ogg"),
    ("thunder", "assets/sounds/thunder.ogg"),
    ("knock", "assets/sounds/knock.ogg"),
    ("laugh", "assets/sounds/laugh.ogg"),
    ("sneeze", "assets/sounds/sneeze.ogg"),
    ("howl", "assets/sounds/howl.ogg"),
    ("hiss", "assets/sounds/hiss.ogg"),
    ("ring", "assets/sounds/ring.ogg"),
    ("pop", "assets/sounds/pop.ogg"),
    ("crash", "assets/sounds/crash.ogg"),
];
