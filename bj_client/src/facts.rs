//! Blackjack trivia shown in the lobby.

use rand::seq::IndexedRandom;

pub const FUN_FACTS: [&str; 10] = [
    "Blackjack is also called 21!",
    "Aces can be worth 1 or 11 points.",
    "The dealer must hit until reaching 17.",
    "You can play with friends or bots!",
    "Try to beat the dealer without going over 21!",
    "Blackjack pays 3:2 in casinos.",
    "The best hand is an Ace and a 10-value card!",
    "Bots play with a simple strategy. Can you outsmart them?",
    "You can add as many bots as you want!",
    "Have fun and good luck! 🍀",
];

pub fn random_fact() -> &'static str {
    FUN_FACTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FUN_FACTS[0])
}
