mod fragmentation;
mod roundtrip;
mod secure_string;
