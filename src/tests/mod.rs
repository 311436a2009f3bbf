
use crate::{
    Bindings, DirectRuntime, EvaluationModel, ImageRole, IndirectRuntime, Jiffle, JiffleContext,
    MemoryImage,
};

pub(crate) fn two_sources() -> [(&'static str, ImageRole); 3] {
    [
        ("src1", ImageRole::Source),
        ("src2", ImageRole::Source),
        ("dest", ImageRole::Dest),
    ]
}

pub(crate) fn compiled<'ctx>(context: &'ctx JiffleContext, script: &str) -> Jiffle<'ctx> {
    Jiffle::compiled(context, script, two_sources()).expect("compile")
}

pub(crate) fn bindings(src1: &MemoryImage, src2: &MemoryImage, dest: &MemoryImage) -> Bindings {
    Bindings::new()
        .bind("src1", src1.clone())
        .bind("src2", src2.clone())
        .bind("dest", dest.clone())
}

pub(crate) fn direct(jiffle: &mut Jiffle<'_>, bindings: Bindings) -> DirectRuntime {
    jiffle
        .build_runtime(EvaluationModel::Direct, bindings)
        .expect("build")
        .into_direct()
        .expect("direct runtime")
}

pub(crate) fn indirect(jiffle: &mut Jiffle<'_>, bindings: Bindings) -> IndirectRuntime {
    jiffle
        .build_runtime(EvaluationModel::Indirect, bindings)
        .expect("build")
        .into_indirect()
        .expect("indirect runtime")
}

pub(crate) fn evaluate_each(runtime: &mut DirectRuntime) {
    for y in 0..runtime.height() {
        for x in 0..runtime.width() {
            runtime.evaluate(x, y).expect("evaluate");
        }
    }
}
