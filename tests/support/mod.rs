pub mod irislab_env;
