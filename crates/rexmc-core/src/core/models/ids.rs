use slotmap::new_key_type;

new_key_type! {
    pub struct ParticleId;
    pub struct RigidBodyId;
    pub struct NuisanceId;
    pub struct WeightId;
}
