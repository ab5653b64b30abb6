mod helpers;
mod mocks;
mod orders;
mod rewards;
mod webhook;
